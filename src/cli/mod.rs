use crate::config::{Config, LLMProvider};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

/// storm-wiki - 调用 STORM 研究引擎，为一个主题生成带引用的维基风格文章
#[derive(Parser, Debug)]
#[command(name = "storm-wiki")]
#[command(
    about = "Research about a topic and create a wikipedia like content containing summary and information with varied perspective."
)]
#[command(version)]
pub struct Args {
    /// 研究主题；配合 --extract-topic 时为一条聊天消息
    pub topic: String,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 语言模型服务的 API KEY
    #[arg(long)]
    pub openai_api_key: Option<String>,

    /// You.com 检索服务的 API KEY
    #[arg(long)]
    pub you_api_key: Option<String>,

    /// 常规模型，用于对话模拟与提问角色
    #[arg(long)]
    pub regular_model: Option<String>,

    /// 高质量模型，用于大纲、正文与润色角色
    #[arg(long)]
    pub smart_model: Option<String>,

    /// LLM Provider (openai, moonshot, deepseek, openrouter, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// 研究引擎命令行，按空白分隔
    ///
    /// 不支持引号转义，程序路径含空格时请在配置文件中以数组形式写 `engine.command`
    #[arg(long)]
    pub engine_command: Option<String>,

    /// 检索模块每次查询返回的结果数
    #[arg(long)]
    pub retrieve_top_k: Option<u32>,

    /// 不附加引用列表
    #[arg(long)]
    pub no_citations: bool,

    /// 把输入当作聊天消息，先提取研究主题
    #[arg(long)]
    pub extract_topic: bool,

    /// 结果写入文件而不是标准输出
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 将CLI参数转换为配置：配置文件 -> 环境变量 -> 命令行参数，后者覆盖前者
    pub fn into_config(self) -> Result<Config> {
        let config = match &self.config {
            Some(config_path) => Config::from_file(config_path)?,
            None => Config::load_default()?,
        };
        Ok(self.apply_to(config.apply_env()))
    }

    /// 用命令行参数覆盖配置
    pub fn apply_to(self, mut config: Config) -> Config {
        if let Some(key) = self.openai_api_key {
            config.openai_api_key = key;
        }
        if let Some(key) = self.you_api_key {
            config.you_api_key = key;
        }
        if let Some(model) = self.regular_model {
            config.regular_model_name = model;
        }
        if let Some(model) = self.smart_model {
            config.smart_model_name = model;
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            match provider_str.parse::<LLMProvider>() {
                Ok(provider) => config.llm.provider = provider,
                Err(_) => warn!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                ),
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }

        if let Some(command) = self.engine_command {
            config.engine.command = command.split_whitespace().map(str::to_string).collect();
        }
        if let Some(k) = self.retrieve_top_k {
            config.runner.retrieve_top_k = k;
        }
        if self.no_citations {
            config.runner.with_citations = false;
        }

        config.verbose = config.verbose || self.verbose;
        config
    }
}
