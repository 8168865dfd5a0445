use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Moonshot => write!(f, "moonshot"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 默认的常规模型
pub const DEFAULT_REGULAR_MODEL: &str = "gpt-4o-mini";

/// 默认的高质量模型
pub const DEFAULT_SMART_MODEL: &str = "gpt-4o";

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "storm-wiki.toml";

/// 应用程序配置（宿主侧的 Valves）
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 语言模型服务的 API KEY
    pub openai_api_key: String,

    /// You.com 检索服务的 API KEY
    pub you_api_key: String,

    /// 常规模型，用于对话模拟与提问角色
    pub regular_model_name: String,

    /// 高质量模型，用于大纲、正文与润色角色
    pub smart_model_name: String,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 引擎运行参数
    pub runner: RunnerConfig,

    /// 外部引擎配置
    pub engine: EngineConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API基地址
    pub api_base_url: String,

    /// 温度
    pub temperature: f64,

    /// top-p 采样
    pub top_p: f64,

    /// 主题提取所使用的模型
    pub topic_model: String,

    /// 主题提取的最大输出tokens
    pub topic_max_tokens: u32,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,
}

/// 传递给引擎的运行参数，适配层本身不解读
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RunnerConfig {
    /// 对话模拟的最大轮次
    pub max_conv_turn: u32,

    /// 最大视角数
    pub max_perspective: u32,

    /// 每次查询的检索结果数
    pub search_top_k: u32,

    /// 引擎内部的最大并发线程数
    pub max_thread_num: u32,

    /// 检索模块每次查询返回的结果数
    pub retrieve_top_k: u32,

    /// 是否在文章末尾附加引用列表
    pub with_citations: bool,
}

/// 外部引擎进程配置
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// 引擎可执行程序及其参数，每个元素原样作为一个参数
    ///
    /// `STORM_ENGINE_COMMAND` 与 `--engine-command` 按空白切分，无法表达含空格的路径
    pub command: Vec<String>,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 使用进程环境变量覆盖配置
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// 使用给定的查找函数覆盖配置，空值视为未设置
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = key;
        }
        if let Some(key) = lookup("YOU_API_KEY") {
            self.you_api_key = key;
        }
        if let Some(model) = lookup("REGULAR_MODEL_NAME") {
            self.regular_model_name = model;
        }
        if let Some(model) = lookup("SMART_MODEL_NAME") {
            self.smart_model_name = model;
        }
        if let Some(url) = lookup("LLM_API_BASE_URL") {
            self.llm.api_base_url = url;
        }
        if let Some(command) = lookup("STORM_ENGINE_COMMAND") {
            self.engine.command = command.split_whitespace().map(str::to_string).collect();
        }
        self
    }

    /// 从默认位置加载配置：当前目录下存在 storm-wiki.toml 时读取，否则使用默认值
    pub fn load_default() -> Result<Self> {
        let default_config_path = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(DEFAULT_CONFIG_FILE);

        if default_config_path.exists() {
            Config::from_file(&default_config_path)
        } else {
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            you_api_key: String::new(),
            regular_model_name: String::from(DEFAULT_REGULAR_MODEL),
            smart_model_name: String::from(DEFAULT_SMART_MODEL),
            llm: LLMConfig::default(),
            runner: RunnerConfig::default(),
            engine: EngineConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_base_url: String::from("https://api.openai.com/v1"),
            temperature: 1.0,
            top_p: 0.9,
            topic_model: String::from(DEFAULT_REGULAR_MODEL),
            topic_max_tokens: 500,
            retry_attempts: 3,
            retry_delay_ms: 2000,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_conv_turn: 3,
            max_perspective: 3,
            search_top_k: 3,
            max_thread_num: 3,
            retrieve_top_k: 5,
            with_citations: true,
        }
    }
}
