//! 主题研究适配层
//!
//! 校验凭据，按次构造引擎配置，驱动引擎完成一次研究运行，读取润色后的文章。

use anyhow::{Context, Result, bail};
use std::path::{Component, Path};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::citations::append_citations;
use crate::config::Config;
use crate::engine::{
    LMConfigs, POLISHED_ARTICLE_FILE, RunPhases, RunnerArguments, RunnerFactory,
};
use crate::retriever::YouRM;

pub mod chat;
pub mod tool;

pub use chat::{ChatMessage, ChatPipeline};
pub use tool::ResearchTopicTool;

/// 检索服务凭据缺失时的提示
pub const MISSING_YOU_API_KEY: &str = "You.com API Key not set, ask the user to set it up.";

/// 语言模型凭据缺失时的提示
pub const MISSING_OPENAI_API_KEY: &str = "OpenAPI Key not set, ask the user to set it up.";

/// 引擎未产出文章时的提示
pub const ARTICLE_NOT_FOUND: &str = "Error: Polished article not found.";

const TEMP_DIR_PREFIX: &str = "storm-wiki-";

/// 主题研究适配器
///
/// 实例只持有配置与运行器工厂。每次 [`StormResearcher::research`] 都会重新构造模型角色、
/// 检索模块与临时输出目录，因此同一实例可以被并发调用。
#[derive(Clone)]
pub struct StormResearcher {
    config: Config,
    factory: Arc<dyn RunnerFactory>,
}

impl StormResearcher {
    pub fn new(config: Config, factory: Arc<dyn RunnerFactory>) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 研究一个主题并返回维基风格的文章
    ///
    /// 凭据缺失和文章缺失以固定文本返回；引擎自身的错误原样向上传播。
    pub async fn research(&self, topic: &str) -> Result<String> {
        if self.config.you_api_key.is_empty() {
            return Ok(MISSING_YOU_API_KEY.to_string());
        }
        if self.config.openai_api_key.is_empty() {
            return Ok(MISSING_OPENAI_API_KEY.to_string());
        }

        // 临时目录在函数返回时删除，无论成功与否
        let temp_output_dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()
            .context("Failed to create temporary output directory")?;
        debug!(
            "Created temporary output directory: {}",
            temp_output_dir.path().display()
        );

        self.run_in(&temp_output_dir, topic).await
    }

    async fn run_in(&self, temp_output_dir: &TempDir, topic: &str) -> Result<String> {
        let lm_configs = LMConfigs::from_config(&self.config);
        let engine_args = RunnerArguments::new(temp_output_dir.path(), &self.config.runner);
        let research_module =
            YouRM::new(&self.config.you_api_key, self.config.runner.retrieve_top_k);

        let mut runner = self
            .factory
            .create(engine_args, lm_configs, research_module)?;

        info!("🔎 开始研究主题: {}", topic);
        runner.run(topic, RunPhases::all()).await?;

        runner.post_run().await?;
        runner.summary().await?;

        let Some(article_output_dir) = runner.article_output_dir() else {
            info!("{}", ARTICLE_NOT_FOUND);
            return Ok(ARTICLE_NOT_FOUND.to_string());
        };
        if !is_inside(article_output_dir, temp_output_dir.path()) {
            bail!(
                "Article output directory {:?} is outside the run directory {:?}",
                article_output_dir,
                temp_output_dir.path()
            );
        }

        let article_path = article_output_dir.join(POLISHED_ARTICLE_FILE);
        debug!(
            "Attempting to read polished article from: {}",
            article_path.display()
        );
        if !article_path.exists() {
            info!("{}", ARTICLE_NOT_FOUND);
            return Ok(ARTICLE_NOT_FOUND.to_string());
        }

        let mut polished_article = tokio::fs::read_to_string(&article_path)
            .await
            .with_context(|| format!("Failed to read polished article: {:?}", article_path))?;

        if self.config.runner.with_citations {
            polished_article = append_citations(polished_article, article_output_dir);
        }

        info!(
            "📄 文章读取完成，长度: {} 字符",
            polished_article.chars().count()
        );
        Ok(polished_article)
    }
}

/// `path` 是否位于 `root` 之内，且不经由 `..` 之类的分量离开
fn is_inside(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root).is_ok_and(|rest| {
        rest.components()
            .all(|component| matches!(component, Component::Normal(_)))
    })
}
