//! reality-probe CLI: check / batch / csv / version.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use reality_probe::domain::{extract_domains_from_csv, is_valid_domain, parse_domains};
use reality_probe::initialization::init_logger_with;
use reality_probe::report;
use reality_probe::{BatchError, Checker, Config, LogLevel};

#[derive(Parser)]
#[command(
    name = "reality-probe",
    about = "Reality 协议目标网站检测工具",
    disable_version_flag = true,
    disable_help_subcommand = true
)]
struct Cli {
    /// Print version information
    #[arg(short = 'v', long = "version", action = clap::ArgAction::SetTrue)]
    version: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Data directory holding gfwlist.conf, Country.mmdb and keyword files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and probe one domain
    Check {
        /// Domain to probe, e.g. apple.com
        domain: String,
    },
    /// Probe a space-separated list of domains
    Batch {
        /// Domains to probe
        #[arg(required = true)]
        domains: Vec<String>,
    },
    /// Probe domains extracted from a RealiTLScanner CSV file
    Csv {
        /// Path to the CSV file
        file: PathBuf,
    },
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help output is a success; anything else is an invocation error.
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            if e.use_stderr() {
                println!();
                print_usage();
            }
            return code;
        }
    };

    if let Err(e) = init_logger_with(cli.log_level.into()) {
        eprintln!("日志初始化失败: {e}");
    }

    if cli.version || matches!(cli.command, Some(Commands::Version)) {
        print_version();
        return ExitCode::SUCCESS;
    }

    let Some(command) = cli.command else {
        print_usage();
        return ExitCode::FAILURE;
    };

    let mut config = Config::default();
    config.log_level = cli.log_level;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let checker = match Checker::with_cancellation(config, cancel) {
        Ok(checker) => checker,
        Err(e) => {
            println!("启动引擎失败: {e}");
            return ExitCode::FAILURE;
        }
    };

    match command {
        Commands::Check { domain } => execute_check(&checker, &domain).await,
        Commands::Batch { domains } => execute_batch(&checker, &domains.join(" ")).await,
        Commands::Csv { file } => execute_csv(&checker, &file).await,
        Commands::Version => unreachable!("handled above"),
    }
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
}

async fn execute_check(checker: &Checker, domain: &str) -> ExitCode {
    let domain = domain.trim();
    if !is_valid_domain(domain) {
        println!();
        println!("错误：域名格式无效 '{domain}'");
        println!("提示：请检查域名格式，例如：apple.com, google.com");
        println!("域名要求：");
        println!("   - 只能包含字母、数字、连字符和点");
        println!("   - 不能以点开头或结尾");
        println!("   - 不能包含连续的点");
        println!("   - 长度不超过253个字符");
        println!();
        return ExitCode::FAILURE;
    }

    report::print_banner();
    report::print_timestamped(&format!("开始检测域名: {domain}"));

    let result = checker.check_domain(domain).await;
    print!("\n{}", report::format_single_result(&result));
    ExitCode::SUCCESS
}

async fn execute_batch(checker: &Checker, domains_str: &str) -> ExitCode {
    let parsed = parse_domains(domains_str);

    if !parsed.invalid.is_empty() {
        println!("警告：发现 {} 个无效域名，已跳过：", parsed.invalid.len());
        for domain in &parsed.invalid {
            println!("   - {domain}");
        }
        println!();
    }
    if !parsed.duplicates.is_empty() {
        println!("提示：已去重 {} 个重复域名", parsed.duplicates.len());
        println!();
    }
    if parsed.valid.is_empty() {
        println!("错误：没有有效的域名可以检测");
        println!("提示：请检查域名格式，例如：apple.com, google.com");
        return ExitCode::FAILURE;
    }

    report::print_banner();
    report::print_timestamped(&format!("开始批量检测 {} 个域名...", parsed.valid.len()));

    run_batch_and_render(checker, &parsed.valid).await
}

async fn execute_csv(checker: &Checker, file: &Path) -> ExitCode {
    if !file.exists() {
        println!();
        println!("错误：CSV文件不存在 '{}'", file.display());
        print_scanner_hint();
        return ExitCode::FAILURE;
    }

    let domains = match extract_domains_from_csv(file) {
        Ok(domains) => domains,
        Err(e) => {
            println!();
            println!("错误：解析CSV文件失败: {e}");
            print_scanner_hint();
            return ExitCode::FAILURE;
        }
    };
    if domains.is_empty() {
        println!();
        println!("错误：未找到有效的域名");
        print_scanner_hint();
        return ExitCode::FAILURE;
    }

    println!("从CSV文件提取到 {} 个域名:", domains.len());
    for (i, domain) in domains.iter().take(10).enumerate() {
        println!("  {}. {domain}", i + 1);
    }
    if domains.len() > 10 {
        println!("  ... 还有 {} 个域名", domains.len() - 10);
    }
    println!();
    report::print_timestamped("开始批量检测...");

    run_batch_and_render(checker, &domains).await
}

async fn run_batch_and_render(checker: &Checker, domains: &[String]) -> ExitCode {
    match checker.check_domains(domains).await {
        Ok(batch_report) => {
            println!("{}", report::format_batch_report(&batch_report));
            ExitCode::SUCCESS
        }
        Err(BatchError::Cancelled) => {
            println!("批量检测失败: 检测已取消");
            ExitCode::FAILURE
        }
    }
}

fn print_version() {
    println!("Reality协议目标网站检测工具");
    println!("版本: {}", env!("CARGO_PKG_VERSION"));
    println!("提交: {}", option_env!("BUILD_COMMIT").unwrap_or("unknown"));
    println!("构建时间: {}", option_env!("BUILD_TIME").unwrap_or("unknown"));
}

fn print_usage() {
    let mut command = Cli::command();
    let _ = command.print_help();
    println!();
    println!("示例:");
    println!("  reality-probe check apple.com");
    println!("  reality-probe batch apple.com google.com microsoft.com");
    println!("  reality-probe csv domains.csv");
}

fn print_scanner_hint() {
    println!("请使用 RealiTLScanner 工具扫描，得到 CSV 文件");
    println!("命令：./RealiTLScanner -addr <VPS IP> -port 443 -thread 50 -timeout 5 -out file.csv");
    println!("（提示：RealiTLScanner 不要在VPS上面运行）");
    println!();
}
