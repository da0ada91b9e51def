//! Test doubles for the media tools and the record store

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use timeline_core::models::MediaRecord;
use timeline_core::{AppError, MediaRecordStore, NewMediaRecord};

use crate::process::{ExternalProcess, ProcessError, ProcessOutput};

/// How a scripted tool invocation behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolScript {
    /// Exit 0; ffmpeg steps write their output file
    Succeed,
    /// Exit 1; ffmpeg steps leave a partial output file behind
    Fail,
    /// Time out; ffmpeg steps leave a partial output file behind
    Timeout,
    /// The binary cannot be started
    SpawnError,
    /// Exit 0 without writing anything
    NoOutput,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl RecordedCall {
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

/// Scripted stand-in for ffprobe and ffmpeg that records every invocation
pub struct FakeMediaTools {
    codec_stdout: String,
    codec_script: ToolScript,
    rotation_stdout: String,
    rotation_script: ToolScript,
    transcode_script: ToolScript,
    orientation_script: ToolScript,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for FakeMediaTools {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeMediaTools {
    /// h264 video, no rotation tag, every ffmpeg step succeeds.
    pub fn new() -> Self {
        Self {
            codec_stdout: "h264\n".to_string(),
            codec_script: ToolScript::Succeed,
            rotation_stdout: String::new(),
            rotation_script: ToolScript::Succeed,
            transcode_script: ToolScript::Succeed,
            orientation_script: ToolScript::Succeed,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn codec(mut self, stdout: &str) -> Self {
        self.codec_stdout = stdout.to_string();
        self.codec_script = ToolScript::Succeed;
        self
    }

    pub fn codec_script(mut self, script: ToolScript) -> Self {
        self.codec_script = script;
        self
    }

    pub fn rotation(mut self, stdout: &str) -> Self {
        self.rotation_stdout = stdout.to_string();
        self.rotation_script = ToolScript::Succeed;
        self
    }

    pub fn rotation_script(mut self, script: ToolScript) -> Self {
        self.rotation_script = script;
        self
    }

    pub fn transcode(mut self, script: ToolScript) -> Self {
        self.transcode_script = script;
        self
    }

    pub fn orientation(mut self, script: ToolScript) -> Self {
        self.orientation_script = script;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }

    pub fn transcode_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.has_arg("-c:a") && c.has_arg("aac"))
            .count()
    }

    pub fn orientation_calls(&self) -> usize {
        self.calls().iter().filter(|c| c.has_arg("rotate=PI")).count()
    }

    fn run_probe(script: ToolScript, stdout: &str, call: &RecordedCall) -> Result<ProcessOutput, ProcessError> {
        match script {
            ToolScript::Succeed => Ok(ProcessOutput {
                status_code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
            ToolScript::NoOutput => Ok(ProcessOutput {
                status_code: Some(0),
                ..Default::default()
            }),
            ToolScript::Fail => Ok(failed_output()),
            ToolScript::Timeout => Err(timeout_error(call)),
            ToolScript::SpawnError => Err(spawn_error(call)),
        }
    }

    fn run_ffmpeg(script: ToolScript, call: &RecordedCall) -> Result<ProcessOutput, ProcessError> {
        let output = call.args.last().map(Path::new);
        let input = call
            .args
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| call.args.get(i + 1))
            .cloned()
            .unwrap_or_default();

        match script {
            ToolScript::Succeed => {
                if let Some(path) = output {
                    std::fs::write(path, format!("derived from {}", input)).unwrap();
                }
                Ok(ProcessOutput {
                    status_code: Some(0),
                    ..Default::default()
                })
            }
            ToolScript::NoOutput => Ok(ProcessOutput {
                status_code: Some(0),
                ..Default::default()
            }),
            ToolScript::Fail => {
                if let Some(path) = output {
                    std::fs::write(path, b"partial").unwrap();
                }
                Ok(failed_output())
            }
            ToolScript::Timeout => {
                if let Some(path) = output {
                    std::fs::write(path, b"partial").unwrap();
                }
                Err(timeout_error(call))
            }
            ToolScript::SpawnError => Err(spawn_error(call)),
        }
    }
}

fn failed_output() -> ProcessOutput {
    ProcessOutput {
        status_code: Some(1),
        stdout: String::new(),
        stderr: "scripted failure".to_string(),
    }
}

fn timeout_error(call: &RecordedCall) -> ProcessError {
    ProcessError::Timeout {
        program: call.program.clone(),
        timeout: call.timeout,
    }
}

fn spawn_error(call: &RecordedCall) -> ProcessError {
    ProcessError::Spawn {
        program: call.program.clone(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such binary"),
    }
}

#[async_trait]
impl ExternalProcess for FakeMediaTools {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        let call = RecordedCall {
            program: program.to_string(),
            args: args.to_vec(),
            timeout,
        };
        self.calls.lock().unwrap().push(call.clone());

        if call.has_arg("stream=codec_name") {
            Self::run_probe(self.codec_script, &self.codec_stdout, &call)
        } else if call.has_arg("stream_tags=rotate") {
            Self::run_probe(self.rotation_script, &self.rotation_stdout, &call)
        } else if call.has_arg("rotate=PI") {
            Self::run_ffmpeg(self.orientation_script, &call)
        } else {
            Self::run_ffmpeg(self.transcode_script, &call)
        }
    }
}

/// Vec-backed record store
#[derive(Default)]
pub struct InMemoryRecords {
    records: Mutex<Vec<MediaRecord>>,
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<MediaRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.all().into_iter().map(|r| r.file_url).collect()
    }
}

#[async_trait]
impl MediaRecordStore for InMemoryRecords {
    async fn insert(&self, record: NewMediaRecord) -> Result<MediaRecord, AppError> {
        let mut records = self.records.lock().unwrap();
        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = MediaRecord {
            id,
            instance_id: record.instance_id,
            file_url: record.file_url,
            file_type: record.file_type,
            file_name: record.file_name,
            file_size: record.file_size,
            created_at: chrono::Utc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn update_url(&self, id: i64, file_url: &str) -> Result<bool, AppError> {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.id == id) {
            Some(r) => {
                r.file_url = file_url.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, AppError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<MediaRecord>, AppError> {
        Ok(self.all().into_iter().find(|r| r.id == id))
    }

    async fn find_by_url(&self, file_url: &str) -> Result<Vec<MediaRecord>, AppError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|r| r.file_url == file_url)
            .collect())
    }

    async fn delete_by_urls(&self, file_urls: &[String]) -> Result<u64, AppError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| !file_urls.contains(&r.file_url));
        Ok((before - records.len()) as u64)
    }

    async fn list_video_records(&self) -> Result<Vec<MediaRecord>, AppError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|r| r.file_type.starts_with("video/") || r.file_url.ends_with(".mp4"))
            .collect())
    }
}
