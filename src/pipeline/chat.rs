//! 聊天宿主入口
//!
//! 只有第一轮用户消息会触发研究：先用一次模型调用提取研究主题，再交给 [`StormResearcher`]。

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::llm::ChatCompletion;
use crate::pipeline::StormResearcher;

/// 管道名称
pub const PIPELINE_NAME: &str = "Storm Wiki Pipeline";

/// 标题生成探测请求的固定回复
pub const TITLE_RESPONSE: &str = "Storm Wiki Generation";

/// 非首轮消息的固定回复
pub const FOLLOW_UP_REFUSAL: &str = "I'm sorry, I can't chat about previous research.";

/// 主题提取的系统指令
pub const TOPIC_EXTRACTION_PROMPT: &str =
    "Extract the main research topic from the user's message. Respond with only the topic, nothing else.";

/// 宿主侧可选的模型条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineInfo {
    pub id: String,
    pub name: String,
}

/// 消息内容：纯文本或多段内容
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl MessageContent {
    /// 文本内容，多段内容时取第一段文本
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(parts) => parts
                .iter()
                .find(|part| part.kind == "text")
                .and_then(|part| part.text.as_deref()),
        }
    }
}

/// 对话消息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == "user"
    }
}

/// 获取最后一条用户消息的文本
pub fn get_last_user_message(messages: &[ChatMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|message| message.is_user())
        .and_then(|message| message.content.text())
}

/// 请求体中的 `title` 是否为真值
fn is_title_request(body: &Value) -> bool {
    match body.get("title") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Null) | None => false,
    }
}

/// 聊天管道
#[derive(Clone)]
pub struct ChatPipeline {
    researcher: StormResearcher,
    completion: Arc<dyn ChatCompletion>,
}

impl ChatPipeline {
    pub fn new(researcher: StormResearcher, completion: Arc<dyn ChatCompletion>) -> Self {
        Self {
            researcher,
            completion,
        }
    }

    pub fn name(&self) -> &'static str {
        PIPELINE_NAME
    }

    /// 宿主可见的模型列表
    pub fn pipelines(&self) -> Vec<PipelineInfo> {
        vec![PipelineInfo {
            id: "storm-wiki-researcher".to_string(),
            name: "Storm-Wiki-Researcher".to_string(),
        }]
    }

    pub async fn on_startup(&self) {
        info!("on_startup: {}", PIPELINE_NAME);
    }

    /// 临时目录随每次调用释放，这里没有需要清理的资源
    pub async fn on_shutdown(&self) {
        info!("on_shutdown: {}", PIPELINE_NAME);
    }

    /// 提取研究主题
    pub async fn extract_topic(&self, user_message: &str) -> Result<String> {
        let llm = &self.researcher.config().llm;
        let topic = self
            .completion
            .complete(
                &llm.topic_model,
                TOPIC_EXTRACTION_PROMPT,
                user_message,
                llm.topic_max_tokens,
            )
            .await?;
        Ok(topic.trim().to_string())
    }

    /// 处理一次宿主请求
    pub async fn pipe(
        &self,
        user_message: &str,
        _model_id: &str,
        messages: &[ChatMessage],
        body: &Value,
    ) -> Result<String> {
        if is_title_request(body) {
            info!("Title Generation");
            return Ok(TITLE_RESPONSE.to_string());
        }

        let user_message_count = messages.iter().filter(|message| message.is_user()).count();
        if user_message_count > 1 {
            return Ok(FOLLOW_UP_REFUSAL.to_string());
        }

        let topic = match self.extract_topic(user_message).await {
            Ok(topic) => topic,
            Err(e) => return Ok(format!("Error extracting topic: {}", e)),
        };
        info!("🧭 提取到研究主题: {}", topic);

        self.researcher.research(&topic).await
    }
}
