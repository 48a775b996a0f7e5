use clap::Parser;
use std::path::PathBuf;

/// 远程下载任务客户端
#[derive(Parser, Debug)]
#[command(name = "dzdl")]
#[command(version = "1.0")]
#[command(author = "rpeng252@gmail.com")]
#[command(about = "提交远程下载任务并跟踪进度，完成后获取打包文件", long_about = None)]
pub struct Cli {
    /// 要下载的链接 (单曲、专辑或歌单)
    #[arg(long, value_name = "URL")]
    #[arg(value_hint = clap::ValueHint::Url)]
    pub url: Option<String>,

    /// ARL Cookie (可选，缺省时使用上次保存的值)
    #[arg(long, value_name = "ARL")]
    pub arl: Option<String>,

    /// 下载服务器地址
    #[arg(long, value_name = "URL")]
    #[arg(default_value = "http://127.0.0.1:5000")]
    #[arg(value_hint = clap::ValueHint::Url)]
    pub server: String,

    /// 凭据保存位置
    #[arg(long, value_name = "FILE")]
    #[arg(default_value = "./sessions/credential.json")]
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub store: PathBuf,

    /// 打包文件保存目录
    #[arg(long, value_name = "DIR")]
    #[arg(default_value = "./downloads")]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub output_dir: PathBuf,

    /// 任务完成后只显示打包文件地址，不下载
    #[arg(long)]
    pub no_fetch: bool,

    /// 从标准输入逐行读取链接，每行都会替换正在进行的任务
    #[arg(long)]
    pub interactive: bool,

    /// 输出调试日志
    #[arg(long, short)]
    pub verbose: bool,
}
