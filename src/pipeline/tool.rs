//! 主题研究工具，供支持函数调用的 Agent 使用

use rig::tool::Tool;
use schemars::JsonSchema;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::pipeline::StormResearcher;

/// 工具参数
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResearchTopicArgs {
    /// The topic user want to research about
    pub topic: String,
}

/// 工具错误
#[derive(Debug, Error)]
pub enum ResearchToolError {
    #[error("research failed: {0}")]
    Research(String),
}

/// 把 [`StormResearcher`] 暴露为 `research_topic` 工具
#[derive(Clone)]
pub struct ResearchTopicTool {
    researcher: StormResearcher,
}

impl ResearchTopicTool {
    pub fn new(researcher: StormResearcher) -> Self {
        Self { researcher }
    }
}

impl Tool for ResearchTopicTool {
    const NAME: &'static str = "research_topic";

    type Error = ResearchToolError;
    type Args = ResearchTopicArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Research about a topic and create a wikipedia like content containing summary and information with varied perspective.".to_string(),
            parameters: schemars::schema_for!(ResearchTopicArgs).to_value(),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        info!("   🔧 tool called...research_topic@{}", args.topic);

        self.researcher
            .research(&args.topic)
            .await
            .map_err(|e| ResearchToolError::Research(format!("{:#}", e)))
    }
}
