//! 外部进程引擎
//!
//! 把一次运行描述为 JSON 任务写入引擎进程的标准输入，凭据通过环境变量传递。
//! 引擎进程负责在 `STORM_ARTICLE_OUTPUT_DIR` 下写出润色后的文章与引用文件。

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::engine::{
    EngineError, LMConfigs, RUN_CONFIG_FILE, ResearchRunner, RunPhases, RunnerArguments,
    RunnerFactory, article_dir_name,
};
use crate::retriever::{RetrieverSettings, YouRM};

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: HashMap<String, Instant>,
    phase_durations: Vec<(String, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .insert(phase_name.to_string(), Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let start_time = self.phase_start_times.remove(phase_name)?;
        let duration = start_time.elapsed();
        self.phase_durations
            .push((phase_name.to_string(), duration));
        Some(duration)
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.start_time.elapsed().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 时间跟踪常量
pub struct TimingKeys;

impl TimingKeys {
    pub const RUN: &'static str = "run";
    pub const POST_RUN: &'static str = "post_run";
}

/// 写入引擎标准输入的任务描述，不含任何凭据
#[derive(Debug, Serialize)]
struct EngineJob<'a> {
    topic: &'a str,
    article_output_dir: &'a Path,
    args: &'a RunnerArguments,
    phases: RunPhases,
    lm_configs: &'a LMConfigs,
    retriever: RetrieverSettings,
}

#[derive(Debug, Serialize)]
struct RunConfigSnapshot<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    topic: &'a str,
    args: &'a RunnerArguments,
    phases: RunPhases,
    lm_configs: &'a LMConfigs,
    retriever: RetrieverSettings,
}

struct CompletedRun {
    topic: String,
    phases: RunPhases,
    article_output_dir: PathBuf,
}

/// 通过外部进程驱动的研究引擎运行器
pub struct ProcessRunner {
    command: Vec<String>,
    args: RunnerArguments,
    lm_configs: LMConfigs,
    retriever: YouRM,
    completed: Option<CompletedRun>,
    timing: TimingScope,
}

impl ProcessRunner {
    pub fn new(
        command: Vec<String>,
        args: RunnerArguments,
        lm_configs: LMConfigs,
        retriever: YouRM,
    ) -> Result<Self, EngineError> {
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(EngineError::NotConfigured);
        }
        Ok(Self {
            command,
            args,
            lm_configs,
            retriever,
            completed: None,
            timing: TimingScope::new(),
        })
    }

    async fn spawn_engine(
        &self,
        payload: &[u8],
        article_output_dir: &Path,
    ) -> Result<(), EngineError> {
        let program = &self.command[0];
        let mut child = Command::new(program)
            .args(&self.command[1..])
            .env("OPENAI_API_KEY", self.lm_configs.api_key().unwrap_or_default())
            .env("YOU_API_KEY", self.retriever.api_key())
            .env("STORM_OUTPUT_DIR", &self.args.output_dir)
            .env("STORM_ARTICLE_OUTPUT_DIR", article_output_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: program.clone(),
                source,
            })?;

        // 引擎可能不读取标准输入就退出
        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(payload).await
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(e.into());
        }

        let output = child.wait_with_output().await?;
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!("[engine] {}", line);
        }

        if !output.status.success() {
            return Err(EngineError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ResearchRunner for ProcessRunner {
    async fn run(&mut self, topic: &str, phases: RunPhases) -> Result<(), EngineError> {
        let article_output_dir = self.args.output_dir.join(article_dir_name(topic));
        tokio::fs::create_dir_all(&article_output_dir).await?;

        let job = EngineJob {
            topic,
            article_output_dir: &article_output_dir,
            args: &self.args,
            phases,
            lm_configs: &self.lm_configs,
            retriever: self.retriever.settings(),
        };
        let payload = serde_json::to_vec(&job)?;

        info!("🚀 启动研究引擎: {}", topic);
        self.timing.start_phase(TimingKeys::RUN);
        self.spawn_engine(&payload, &article_output_dir).await?;
        self.timing.end_phase(TimingKeys::RUN);
        info!("✓ 研究引擎运行完成");

        self.completed = Some(CompletedRun {
            topic: topic.to_string(),
            phases,
            article_output_dir,
        });
        Ok(())
    }

    async fn post_run(&mut self) -> Result<(), EngineError> {
        let completed = self.completed.as_ref().ok_or(EngineError::NotStarted)?;
        self.timing.start_phase(TimingKeys::POST_RUN);

        let snapshot = RunConfigSnapshot {
            generated_at: chrono::Utc::now(),
            topic: &completed.topic,
            args: &self.args,
            phases: completed.phases,
            lm_configs: &self.lm_configs,
            retriever: self.retriever.settings(),
        };
        let run_config_path = completed.article_output_dir.join(RUN_CONFIG_FILE);
        tokio::fs::write(&run_config_path, serde_json::to_vec_pretty(&snapshot)?).await?;
        debug!("💾 已保存运行配置: {}", run_config_path.display());

        self.timing.end_phase(TimingKeys::POST_RUN);
        Ok(())
    }

    async fn summary(&self) -> Result<(), EngineError> {
        if self.completed.is_none() {
            return Err(EngineError::NotStarted);
        }
        info!("{}", self.timing.generate_timing_report());
        Ok(())
    }

    fn article_output_dir(&self) -> Option<&Path> {
        self.completed
            .as_ref()
            .map(|completed| completed.article_output_dir.as_path())
    }
}

/// 按配置的命令行构造 [`ProcessRunner`]
#[derive(Debug, Clone)]
pub struct ProcessRunnerFactory {
    command: Vec<String>,
}

impl ProcessRunnerFactory {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl RunnerFactory for ProcessRunnerFactory {
    fn create(
        &self,
        args: RunnerArguments,
        lm_configs: LMConfigs,
        retriever: YouRM,
    ) -> Result<Box<dyn ResearchRunner>, EngineError> {
        let runner = ProcessRunner::new(self.command.clone(), args, lm_configs, retriever)?;
        Ok(Box::new(runner))
    }
}
