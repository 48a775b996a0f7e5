use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use dzdl::auth::{CredentialStore, FileCredentialStore};
use dzdl::cli::Cli;
use dzdl::common::api::client::ApiClient;
use dzdl::downloader::{Task, TaskSession, TaskState};
use dzdl::ui::{DisplayState, Notifier, TerminalView};
use dzdl::{log_error, log_file, log_info};

/// 命令行参数优先，否则使用上次保存的凭据
fn load_credential(args: &Cli, store: &dyn CredentialStore) -> String {
    if let Some(arl) = &args.arl {
        return arl.clone();
    }

    match store.load() {
        Ok(Some(value)) => {
            info!("使用已保存的凭据");
            value
        }
        Ok(None) => String::new(),
        Err(e) => {
            warn!("读取已保存的凭据失败: {}", e);
            String::new()
        }
    }
}

/// 处理到达终态的任务，成功时返回 true
async fn handle_terminal(
    session: &TaskSession,
    client: &ApiClient,
    args: &Cli,
    task: Option<Task>,
) -> bool {
    let Some(task) = task else {
        debug!("轮询已被取消");
        return false;
    };

    match task.state {
        TaskState::Finished => true,
        TaskState::FinishedWithPackage => {
            let DisplayState::Package(action) = session.display() else {
                return true;
            };
            if args.no_fetch {
                return true;
            }

            match action.fetch(client, &args.output_dir).await {
                Ok(path) => {
                    log_file!("已保存", path.display().to_string());
                    true
                }
                Err(e) => {
                    log_error!("获取打包文件失败: {}", e);
                    false
                }
            }
        }
        state => {
            debug!("任务 {} 结束: {}", task.id, state);
            false
        }
    }
}

async fn run_once(
    session: &mut TaskSession,
    client: &ApiClient,
    args: &Cli,
    credential: &str,
) -> ExitCode {
    let url = args.url.clone().unwrap_or_default();
    if session.start(&url, credential).await.is_err() {
        return ExitCode::FAILURE;
    }

    tokio::select! {
        task = session.wait() => {
            if handle_terminal(session, client, args, task).await {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        _ = tokio::signal::ctrl_c() => {
            session.cancel();
            log_info!("已取消");
            ExitCode::FAILURE
        }
    }
}

async fn run_interactive(
    session: &mut TaskSession,
    client: &ApiClient,
    args: &Cli,
    credential: &str,
) -> anyhow::Result<ExitCode> {
    log_info!("交互模式：每行输入一个链接，新链接会替换正在进行的任务，Ctrl-D 结束");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    if let Some(url) = &args.url {
        if let Err(e) = session.start(url, credential).await {
            debug!("任务未启动: {}", e);
        }
    }

    loop {
        if !stdin_open && !session.is_polling() {
            break;
        }

        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    let url = line.trim();
                    if !url.is_empty() {
                        if let Err(e) = session.start(url, credential).await {
                            debug!("任务未启动: {}", e);
                        }
                    }
                }
                None => stdin_open = false,
            },
            task = session.wait(), if session.is_polling() => {
                handle_terminal(session, client, args, task).await;
            }
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
                log_info!("已取消");
                break;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();

    // 初始化日志
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let store: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::new(&args.store));
    let credential = load_credential(&args, store.as_ref());

    let client = ApiClient::new(&args.server)?;
    info!("下载服务器: {}", client.base_url());

    let mut session = TaskSession::new(
        Arc::new(client.clone()),
        store,
        Notifier::terminal(),
        Box::new(TerminalView::new()),
    );

    if args.interactive {
        run_interactive(&mut session, &client, &args, &credential).await
    } else {
        Ok(run_once(&mut session, &client, &args, &credential).await)
    }
}
