use std::path::PathBuf;

use anyhow::Result;

use auto_problem_solver::utils::logging;
use auto_problem_solver::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置，首个命令行参数可覆盖问题ID文件路径
    let config = Config::from_env();
    let problem_ids_file = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.problem_ids_file.clone());

    // 初始化并运行应用
    let app = App::initialize(config)?;
    app.run(&PathBuf::from(problem_ids_file)).await?;

    Ok(())
}
