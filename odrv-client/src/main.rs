use odrv_client::run_cli;
use odrv_client::util::shutdown::spawn_ctrl_c_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    spawn_ctrl_c_handler();

    run_cli().await
}
