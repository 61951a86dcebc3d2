use anyhow::{Context, Result};
use log::{info, warn};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;

use search_filter::compiler::{CompileResult, FilterCompiler, Rewrite};
use search_filter::config::{FilterConfig, DEFAULT_CONFIG_FILE};
use search_filter::parser::parse_str;

const HELP: &str = r#"输入一条过滤语句，例如:
  Filter: Age[>=18 AND <65]; Status["Active" OR "Held" OR "Bounced"]
  Filter: EmailAddress[LIKE "%@example.com"]; Region[NOT IN ("EU", "APAC")]
命令:
  :help  显示帮助
  :quit  退出"#;

/// 加载配置，优先使用环境变量指定的文件，失败时使用默认配置
fn load_config() -> FilterConfig {
    let path = env::var("SEARCH_FILTER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    match FilterConfig::from_json_file(&path) {
        Ok(config) => {
            info!("使用配置文件: {path}");
            config
        }
        Err(e) => {
            warn!("{e}，使用默认配置");
            FilterConfig::default()
        }
    }
}

fn print_result(result: &CompileResult, pretty: bool) -> Result<()> {
    let json = result
        .operand
        .to_json_string(pretty)
        .context("无法序列化过滤器")?;
    println!("{json}");

    for rewrite in &result.rewrites {
        match rewrite {
            Rewrite::RangeMerged { field } => {
                println!("  • {field}: 两个边界合并为 between");
            }
            Rewrite::OrToIn { field, value_count } => {
                println!("  • {field}: {value_count} 个 OR 相等条件合并为 IN");
            }
        }
    }
    Ok(())
}

/// 处理一行输入：分词、解析、编译并输出 JSON
fn run_line(compiler: &FilterCompiler, line: &str, pretty: bool) -> Result<()> {
    let query = match parse_str(line) {
        Ok(query) => query,
        Err(e) => {
            println!("✗ 解析失败: {}", e.message);
            if let Some(span) = e.span {
                println!("  位置 {}-{}", span.start, span.end);
            }
            return Ok(());
        }
    };

    match compiler.compile(&query) {
        Ok(result) => print_result(&result, pretty)?,
        Err(e) => println!("✗ 编译失败: {e}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let config = load_config();
    let compiler = FilterCompiler::from_config(&config);

    let mut editor = DefaultEditor::new().context("无法初始化行编辑器")?;
    println!("--- Search Filter: DSL 到过滤器 JSON ---");
    println!("输入 :help 查看帮助");

    loop {
        match editor.readline("filter> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                // 历史记录写入失败不影响执行
                let _ = editor.add_history_entry(line);

                match line {
                    ":quit" | ":q" => break,
                    ":help" => println!("{HELP}"),
                    _ => run_line(&compiler, line, config.pretty)?,
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("读取输入失败"),
        }
    }

    Ok(())
}
