//! 研究引擎接缝 - 以类型化的方式描述外部 STORM 引擎的构造参数与生命周期

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::RunnerConfig;
use crate::retriever::YouRM;

pub mod lm_configs;
pub mod process;

pub use lm_configs::{LMConfigs, LanguageModel, ModelRole};
pub use process::{ProcessRunner, ProcessRunnerFactory};

/// 引擎写出的润色后文章文件名
pub const POLISHED_ARTICLE_FILE: &str = "storm_gen_article_polished.txt";

/// 引擎写出的引用索引文件名
pub const URL_TO_INFO_FILE: &str = "url_to_info.json";

/// 运行配置快照文件名
pub const RUN_CONFIG_FILE: &str = "run_config.json";

const MAX_ARTICLE_DIR_NAME_LEN: usize = 125;

// 常见文件系统对单个路径分量的字节上限
const MAX_ARTICLE_DIR_NAME_BYTES: usize = 255;

const FALLBACK_ARTICLE_DIR_NAME: &str = "_";

/// 引擎错误
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("research engine command is not configured")]
    NotConfigured,

    #[error("failed to start research engine `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("research engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("research engine has not been run yet")]
    NotStarted,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 引擎构造参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerArguments {
    pub output_dir: PathBuf,
    pub max_conv_turn: u32,
    pub max_perspective: u32,
    pub search_top_k: u32,
    pub max_thread_num: u32,
}

impl RunnerArguments {
    pub fn new(output_dir: impl Into<PathBuf>, runner: &RunnerConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_conv_turn: runner.max_conv_turn,
            max_perspective: runner.max_perspective,
            search_top_k: runner.search_top_k,
            max_thread_num: runner.max_thread_num,
        }
    }
}

/// 一次运行中启用的阶段
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunPhases {
    pub do_research: bool,
    pub do_generate_outline: bool,
    pub do_generate_article: bool,
    pub do_polish_article: bool,
}

impl RunPhases {
    /// 全部四个阶段
    pub fn all() -> Self {
        Self {
            do_research: true,
            do_generate_outline: true,
            do_generate_article: true,
            do_polish_article: true,
        }
    }
}

/// 研究引擎的运行器
///
/// 调用顺序固定为 `run` -> `post_run` -> `summary`，
/// `article_output_dir` 在 `run` 之后才有值。
#[async_trait]
pub trait ResearchRunner: Send + Sync {
    /// 执行研究、大纲、正文、润色流程
    async fn run(&mut self, topic: &str, phases: RunPhases) -> Result<(), EngineError>;

    /// 运行结束后的收尾工作
    async fn post_run(&mut self) -> Result<(), EngineError>;

    /// 输出运行摘要
    async fn summary(&self) -> Result<(), EngineError>;

    /// 本次运行实际使用的输出子目录
    fn article_output_dir(&self) -> Option<&Path>;
}

/// 运行器工厂，每次调用都构造一个新的运行器
pub trait RunnerFactory: Send + Sync {
    fn create(
        &self,
        args: RunnerArguments,
        lm_configs: LMConfigs,
        retriever: YouRM,
    ) -> Result<Box<dyn ResearchRunner>, EngineError>;
}

/// 由主题推导文章目录名
///
/// 空格与路径分隔符替换为下划线，截断到 125 个字符且不超过 255 字节。
/// 结果总是单个普通路径分量：`.`、`..` 与空名映射为 `_`。
pub fn article_dir_name(topic: &str) -> String {
    let mut name = String::new();
    for c in topic.chars().take(MAX_ARTICLE_DIR_NAME_LEN) {
        let c = match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        };
        if name.len() + c.len_utf8() > MAX_ARTICLE_DIR_NAME_BYTES {
            break;
        }
        name.push(c);
    }

    if matches!(name.as_str(), "" | "." | "..") {
        return FALLBACK_ARTICLE_DIR_NAME.to_string();
    }
    name
}
