use std::net::SocketAddr;
use std::time::Duration;

use skiload_testserver::{TestServerOptions, TestServerStats, router};
use tokio::net::TcpListener;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut options = TestServerOptions::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 127.0.0.1:0")
                })?;
                bind_addr = addr.parse()?;
            }
            "--fail-every" => {
                let n = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--fail-every requires a request count"))?;
                options.fail_every = Some(n.parse()?);
            }
            "--delay-ms" => {
                let ms = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--delay-ms requires milliseconds"))?;
                options.delay = Some(Duration::from_millis(ms.parse()?));
            }
            "-h" | "--help" => {
                eprintln!(
                    "skiload-testserver\n\nUSAGE:\n  skiload-testserver [--bind 127.0.0.1:0] [--fail-every N] [--delay-ms MS]\n\nOUTPUT:\n  Prints HTTP_URL=<url> to stdout once ready."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let app = router(TestServerStats::default(), options);

    println!("HTTP_URL=http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
