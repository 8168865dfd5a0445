use serde::{Deserialize, Serialize};

use crate::config::{Config, LLMProvider};

/// 引擎中使用语言模型的五个角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    ConvSimulator,
    QuestionAsker,
    OutlineGen,
    ArticleGen,
    ArticlePolish,
}

/// 模型档位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Regular,
    Smart,
}

impl ModelRole {
    pub const ALL: [ModelRole; 5] = [
        ModelRole::ConvSimulator,
        ModelRole::QuestionAsker,
        ModelRole::OutlineGen,
        ModelRole::ArticleGen,
        ModelRole::ArticlePolish,
    ];

    /// 角色使用的模型档位
    pub fn tier(&self) -> ModelTier {
        match self {
            ModelRole::ConvSimulator | ModelRole::QuestionAsker => ModelTier::Regular,
            ModelRole::OutlineGen | ModelRole::ArticleGen | ModelRole::ArticlePolish => {
                ModelTier::Smart
            }
        }
    }

    /// 角色的最大输出tokens
    pub fn max_tokens(&self) -> u32 {
        match self {
            ModelRole::ConvSimulator => 500,
            ModelRole::QuestionAsker => 500,
            ModelRole::OutlineGen => 400,
            ModelRole::ArticleGen => 700,
            ModelRole::ArticlePolish => 4000,
        }
    }
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelRole::ConvSimulator => write!(f, "conv_simulator"),
            ModelRole::QuestionAsker => write!(f, "question_asker"),
            ModelRole::OutlineGen => write!(f, "outline_gen"),
            ModelRole::ArticleGen => write!(f, "article_gen"),
            ModelRole::ArticlePolish => write!(f, "article_polish"),
        }
    }
}

/// 单个语言模型的调用配置
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageModel {
    pub provider: LLMProvider,
    pub model: String,
    pub api_base_url: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    /// 凭据只通过环境变量交给引擎，不参与序列化
    #[serde(skip)]
    pub api_key: String,
}

impl std::fmt::Debug for LanguageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageModel")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// 引擎的五角色模型配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LMConfigs {
    conv_simulator_lm: Option<LanguageModel>,
    question_asker_lm: Option<LanguageModel>,
    outline_gen_lm: Option<LanguageModel>,
    article_gen_lm: Option<LanguageModel>,
    article_polish_lm: Option<LanguageModel>,
}

impl LMConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按固定分配表构造五个角色：常规模型负责对话模拟和提问，高质量模型负责大纲、正文和润色
    pub fn from_config(config: &Config) -> Self {
        let mut lm_configs = Self::new();
        for role in ModelRole::ALL {
            let model_name = match role.tier() {
                ModelTier::Regular => &config.regular_model_name,
                ModelTier::Smart => &config.smart_model_name,
            };
            let lm = LanguageModel {
                provider: config.llm.provider.clone(),
                model: model_name.clone(),
                api_base_url: config.llm.api_base_url.clone(),
                max_tokens: role.max_tokens(),
                temperature: config.llm.temperature,
                top_p: config.llm.top_p,
                api_key: config.openai_api_key.clone(),
            };
            lm_configs.set(role, lm);
        }
        lm_configs
    }

    pub fn set_conv_simulator_lm(&mut self, lm: LanguageModel) {
        self.conv_simulator_lm = Some(lm);
    }

    pub fn set_question_asker_lm(&mut self, lm: LanguageModel) {
        self.question_asker_lm = Some(lm);
    }

    pub fn set_outline_gen_lm(&mut self, lm: LanguageModel) {
        self.outline_gen_lm = Some(lm);
    }

    pub fn set_article_gen_lm(&mut self, lm: LanguageModel) {
        self.article_gen_lm = Some(lm);
    }

    pub fn set_article_polish_lm(&mut self, lm: LanguageModel) {
        self.article_polish_lm = Some(lm);
    }

    pub fn set(&mut self, role: ModelRole, lm: LanguageModel) {
        match role {
            ModelRole::ConvSimulator => self.set_conv_simulator_lm(lm),
            ModelRole::QuestionAsker => self.set_question_asker_lm(lm),
            ModelRole::OutlineGen => self.set_outline_gen_lm(lm),
            ModelRole::ArticleGen => self.set_article_gen_lm(lm),
            ModelRole::ArticlePolish => self.set_article_polish_lm(lm),
        }
    }

    pub fn get(&self, role: ModelRole) -> Option<&LanguageModel> {
        match role {
            ModelRole::ConvSimulator => self.conv_simulator_lm.as_ref(),
            ModelRole::QuestionAsker => self.question_asker_lm.as_ref(),
            ModelRole::OutlineGen => self.outline_gen_lm.as_ref(),
            ModelRole::ArticleGen => self.article_gen_lm.as_ref(),
            ModelRole::ArticlePolish => self.article_polish_lm.as_ref(),
        }
    }

    /// 五个角色是否都已配置
    pub fn is_complete(&self) -> bool {
        ModelRole::ALL.iter().all(|role| self.get(*role).is_some())
    }

    /// 各角色共享的凭据
    pub fn api_key(&self) -> Option<&str> {
        ModelRole::ALL
            .iter()
            .find_map(|role| self.get(*role))
            .map(|lm| lm.api_key.as_str())
    }
}
