//! Basic usage example with the mock resolver.
//!
//! Builds an S3 driver and a raw driver from JSON descriptors, then loads the
//! raw artifact into a temporary directory.
//!
//! Run with: RUST_LOG=artifactmux=debug cargo run --example basic

use artifactmux::drivers::s3::S3Driver;
use artifactmux::resolvers::MockSecretResolver;
use artifactmux::{factory, Artifact, ArtifactError, Config, Context};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> artifactmux::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    artifactmux::init();

    let resolver = MockSecretResolver::new()
        .with_secret("minio-creds", "accessKey", "minioadmin")
        .with_secret("minio-creds", "secretKey", "minioadmin");
    let ctx = Context::new(Config::new().with_secret_timeout(Duration::from_secs(5)));

    println!("=== S3 ===");
    let model = Artifact::from_json(
        r#"{
            "name": "model",
            "s3": {
                "endpoint": "localhost:9000",
                "insecure": true,
                "bucket": "models",
                "key": "v3/model.tgz",
                "accessKeySecret": {"name": "minio-creds", "key": "accessKey"},
                "secretKeySecret": {"name": "minio-creds", "key": "secretKey"}
            }
        }"#,
    )?;

    let driver = factory::new_driver(&ctx, &model, &resolver).await?;
    if let Some(s3) = driver.downcast_ref::<S3Driver>() {
        println!("endpoint:   {:?}", s3.endpoint_url());
        println!("access key: {}", s3.access_key);
        println!("secret key: {}", s3.secret_key);
    }
    println!("resolver calls: {:?}\n", resolver.calls());

    println!("=== Raw ===");
    let greeting = Artifact::from_json(r#"{"name": "greeting", "raw": {"data": "hello, world\n"}}"#)?;
    let driver = factory::new_driver(&ctx, &greeting, &resolver).await?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("greeting.txt");
    driver.load(&greeting, &path).await?;
    print!("{}", tokio::fs::read_to_string(&path).await?);

    match driver.save(&path, &greeting).await {
        Err(ArtifactError::NotSupported { driver, operation }) => {
            println!("{} does not support {}\n", driver, operation);
        }
        other => println!("unexpected: {:?}\n", other),
    }

    println!("=== Unsupported ===");
    match factory::new_driver(&ctx, &Artifact::new("nowhere"), &resolver).await {
        Err(err) if err.is_unsupported_driver() => println!("{}", err),
        Err(err) => return Err(err),
        Ok(_) => println!("unexpected driver"),
    }

    Ok(())
}
