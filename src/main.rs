use stress_test::{stress_test_documents, stress_test_scaling, BoxError};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main())
}

async fn async_main() -> Result<(), BoxError> {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            RANGES ENGINE STRESS TESTS                      ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    // Test 1: few documents, small batches
    let stats = stress_test_documents(4, 200, 3).await?;
    stats.print();

    // Test 2: more documents, larger batches
    let stats = stress_test_documents(16, 500, 6).await?;
    stats.print();

    // Test 3: scaling analysis
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║          SCALING ANALYSIS                                  ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    stress_test_scaling(20, 4).await?;

    println!("\n✓ All stress tests completed successfully!");
    Ok(())
}
