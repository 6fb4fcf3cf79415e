//! Interactive session state.
//!
//! A [`Session`] holds everything one page of the web front end would: the
//! trim form, the selected video's duration, the crop editor and the jobs
//! being followed. Commands come in through [`Session::dispatch`]; monitor
//! events from spawned jobs come back through [`Session::handle_event`].
//! Both return the lines to print.
//!
//! Validation and configuration problems are reported as `Error: ...`
//! lines and never end the session.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use cliptrim_client::api::{ApiError, BackendApi, JobStarted};
use cliptrim_client::events::{ChannelObserver, MonitorEvent};
use cliptrim_client::monitor::{MonitorOptions, ProgressMonitor};
use cliptrim_core::commands::CropCommand;
use cliptrim_core::crop_editor::CropEditor;
use cliptrim_core::error::CoreError;
use cliptrim_core::progress::{ProgressPayload, ProgressView};
use cliptrim_core::submission::{DownloadRequest, ProcessForm, ProcessRequest};
use cliptrim_core::surface::BoundedSurface;
use cliptrim_core::timecode::format_time;
use cliptrim_core::types::{PixelRect, ProcessId, RegionName};
use tokio::sync::mpsc;

use crate::command::{Command, HELP};
use crate::config::CliConfig;
use crate::frame::{save_png, ImageFrameSource};

pub type Editor = CropEditor<BoundedSurface, ImageFrameSource>;

/// What a followed job produces once it completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    /// A remote video being stored under `filename`.
    Download { filename: String },
    /// A trim-and-crop run writing `filename`.
    Process {
        filename: String,
        download_url: Option<String>,
    },
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download { filename } => write!(f, "download of {filename}"),
            Self::Process { filename, .. } => write!(f, "processing of {filename}"),
        }
    }
}

struct Job {
    kind: JobKind,
    monitor: ProgressMonitor,
}

pub struct Session {
    api: Arc<BackendApi>,
    editor: Editor,
    monitor_options: MonitorOptions,
    form: ProcessForm,
    duration: Option<String>,
    jobs: HashMap<ProcessId, Job>,
    events_tx: mpsc::UnboundedSender<MonitorEvent>,
}

impl Session {
    /// Create a session. Monitor events for its jobs arrive on the
    /// returned receiver and should be passed to [`Session::handle_event`].
    pub fn new(
        api: BackendApi,
        frames: ImageFrameSource,
        monitor_options: MonitorOptions,
    ) -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            api: Arc::new(api),
            editor: CropEditor::new(BoundedSurface::new(), frames),
            monitor_options,
            form: ProcessForm::default(),
            duration: None,
            jobs: HashMap::new(),
            events_tx,
        };
        (session, events_rx)
    }

    pub fn from_config(
        config: &CliConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<MonitorEvent>), ApiError> {
        let api = BackendApi::new(&config.backend_url)?.with_timeout(config.request_timeout);
        let frames = ImageFrameSource::new(config.frame_path.clone());
        Ok(Self::new(api, frames, config.monitor_options()))
    }

    pub fn form(&self) -> &ProcessForm {
        &self.form
    }

    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn running_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Run one command and return the lines to show.
    pub async fn dispatch(&mut self, command: Command) -> Vec<String> {
        match command {
            Command::Duration(filename) => match self.api.get_duration(&filename).await {
                Ok(duration) => vec![format!("{filename}: {duration}")],
                Err(e) => vec![format!("Error getting video duration: {e}")],
            },
            Command::Download { url, filename } => self.download(&url, &filename).await,
            Command::Select(filename) => self.select(&filename).await,
            Command::StartTime(time) => {
                self.form.start_time = time;
                vec![format!("Start time: {}", self.form.start_time)]
            }
            Command::EndTime(time) => {
                self.form.end_time = time;
                vec![format!("End time: {}", self.form.end_time)]
            }
            Command::MarkStart(seconds) => {
                self.form.start_time = format_time(seconds);
                vec![format!("Start time: {}", self.form.start_time)]
            }
            Command::MarkEnd(seconds) => {
                self.form.end_time = format_time(seconds);
                vec![format!("End time: {}", self.form.end_time)]
            }
            Command::Frame(path) => {
                self.editor.frames_mut().set_path(&path);
                vec![format!("Frame source: {}", path.display())]
            }
            Command::Crop(command) => self.crop(command),
            Command::CropPreview(dir) => self.preview(dir.as_deref()),
            Command::Process(filename) => self.process(filename).await,
            Command::Cleanup { confirmed: false } => vec![
                "This deletes every stored video on the backend.".to_string(),
                "Run `cleanup confirm` to continue.".to_string(),
            ],
            Command::Cleanup { confirmed: true } => self.cleanup().await,
            Command::Cancel => self.cancel_all(),
            Command::Status => self.status(),
            Command::Help => HELP.lines().map(str::to_string).collect(),
            Command::Quit => {
                self.cancel_all();
                vec!["Bye".to_string()]
            }
        }
    }

    /// React to an event from one of this session's monitors.
    pub async fn handle_event(&mut self, event: MonitorEvent) -> Vec<String> {
        match event {
            MonitorEvent::Progress {
                process_id,
                payload,
                ..
            } => match self.jobs.get(&process_id) {
                Some(_) => vec![format!(
                    "[{process_id}] {}",
                    ProgressView::from_payload(&payload).summary()
                )],
                None => Vec::new(),
            },
            MonitorEvent::Completed {
                process_id,
                payload,
                ..
            } => match self.jobs.remove(&process_id) {
                Some(job) => self.job_completed(job.kind, payload).await,
                None => Vec::new(),
            },
            MonitorEvent::Failed {
                process_id,
                message,
                ..
            } => match self.jobs.remove(&process_id) {
                Some(job) => {
                    tracing::warn!(process_id = %process_id, job = %job.kind, error = %message, "Job failed");
                    vec![format!("Error: {message}")]
                }
                None => Vec::new(),
            },
        }
    }

    // ---- commands ----

    async fn download(&mut self, url: &str, filename: &str) -> Vec<String> {
        let request = match DownloadRequest::new(url, filename) {
            Ok(request) => request,
            Err(e) => return vec![core_error(&e)],
        };

        match self.api.download_video(&request).await {
            Ok(job) => {
                let stored = job
                    .filename
                    .clone()
                    .unwrap_or_else(|| request.stored_filename());
                let id = job.process_id.clone();
                self.follow(job, JobKind::Download { filename: stored });
                vec![format!("Download started (job {id})")]
            }
            Err(e) => vec![format!("Error: {e}")],
        }
    }

    async fn select(&mut self, filename: &str) -> Vec<String> {
        match self.api.get_duration(filename).await {
            Ok(duration) => {
                self.form.input_file = filename.to_string();
                self.duration = Some(duration);
                vec![format!(
                    "Selected {filename} (duration {})",
                    self.duration.as_deref().unwrap_or_default()
                )]
            }
            Err(e) => {
                self.form.input_file.clear();
                self.duration = None;
                vec![format!("Error getting video duration: {e}")]
            }
        }
    }

    fn crop(&mut self, command: CropCommand) -> Vec<String> {
        let editing = self.editor.active_region();
        if let Err(e) = self.editor.dispatch(command.clone()) {
            return vec![core_error(&e)];
        }

        match command {
            CropCommand::BeginEdit(region) => vec![format!(
                "Editing {region}: {} (aspect lock {})",
                describe(self.editor.fields()),
                on_off(self.editor.aspect_locked())
            )],
            CropCommand::OverlayMoved(_) | CropCommand::FieldChanged { .. } => {
                vec![describe(self.editor.fields())]
            }
            CropCommand::SetAspectLock(locked) => vec![format!("Aspect lock {}", on_off(locked))],
            CropCommand::Commit => {
                let Some(region) = editing else {
                    return Vec::new();
                };
                let saved = self
                    .editor
                    .crop_set()
                    .get(region)
                    .map(|r| describe(r.rounded()))
                    .unwrap_or_default();
                vec![format!("Saved {region} crop: {saved}")]
            }
            CropCommand::Cancel => vec!["Crop edit cancelled".to_string()],
            CropCommand::PreviewBoth => self.preview_lines(),
        }
    }

    fn preview(&mut self, dir: Option<&Path>) -> Vec<String> {
        if let Err(e) = self.editor.preview_both_regions() {
            return vec![core_error(&e)];
        }
        let mut lines = self.preview_lines();

        if let Some(dir) = dir {
            for region in RegionName::ALL {
                let Some(image) = self.editor.preview(region) else {
                    continue;
                };
                let path = dir.join(format!("{region}.png"));
                match save_png(image, &path) {
                    Ok(()) => lines.push(format!("Wrote {}", path.display())),
                    Err(e) => lines.push(core_error(&e)),
                }
            }
        }
        lines
    }

    fn preview_lines(&self) -> Vec<String> {
        RegionName::ALL
            .iter()
            .filter_map(|region| {
                self.editor.preview(*region).map(|image| {
                    format!("{region} preview: {}x{}", image.width(), image.height())
                })
            })
            .collect()
    }

    async fn process(&mut self, filename: String) -> Vec<String> {
        self.form.filename = filename;
        let duration = self.duration.clone().unwrap_or_default();
        let request = match ProcessRequest::new(&self.form, &duration, self.editor.crop_set()) {
            Ok(request) => request,
            Err(e) => return vec![core_error(&e)],
        };

        match self.api.process_video(&request).await {
            Ok(job) => {
                let id = job.process_id.clone();
                let kind = JobKind::Process {
                    filename: request.filename.clone(),
                    download_url: job.download_url.clone(),
                };
                self.follow(job, kind);
                vec![format!("Processing started (job {id})")]
            }
            Err(e) => vec![format!("Error: {e}")],
        }
    }

    async fn cleanup(&mut self) -> Vec<String> {
        match self.api.cleanup().await {
            Ok(message) => {
                self.form = ProcessForm::default();
                self.duration = None;
                vec![message]
            }
            Err(e) => vec![format!("Error: {e}")],
        }
    }

    fn cancel_all(&mut self) -> Vec<String> {
        let count = self.jobs.len();
        for (process_id, job) in self.jobs.drain() {
            tracing::info!(process_id = %process_id, job = %job.kind, "Stopped following job");
            job.monitor.cancel();
        }
        match count {
            0 => vec!["No running jobs".to_string()],
            n => vec![format!("Stopped following {n} job(s)")],
        }
    }

    fn status(&self) -> Vec<String> {
        let options = self.monitor_options;
        let mut lines = vec![format!(
            "Backend: {} ({} transport)",
            self.api.base_url(),
            options.transport
        )];

        lines.push(match (&self.form.input_file, &self.duration) {
            (file, Some(duration)) if !file.is_empty() => format!("Video: {file} ({duration})"),
            _ => "Video: none selected".to_string(),
        });
        lines.push(format!(
            "Trim: {} -> {}",
            or_dash(&self.form.start_time),
            or_dash(&self.form.end_time)
        ));
        lines.push(match self.editor.frames().path() {
            Some(path) => format!("Frame: {}", path.display()),
            None => "Frame: none".to_string(),
        });

        let crops = self.editor.crop_set();
        for region in RegionName::ALL {
            lines.push(match crops.get(region) {
                Some(rect) => format!("{region} crop: {}", describe(rect.rounded())),
                None => format!("{region} crop: not set"),
            });
        }
        if let Some(region) = self.editor.active_region() {
            lines.push(format!("Editing {region}: {}", describe(self.editor.fields())));
        }
        lines.push(format!("Aspect lock {}", on_off(self.editor.aspect_locked())));

        for (process_id, job) in &self.jobs {
            lines.push(format!("Job {process_id}: {}", job.kind));
        }
        lines
    }

    // ---- jobs ----

    /// Spawn a monitor for a started job. Its events come back through the
    /// session's channel.
    fn follow(&mut self, job: JobStarted, kind: JobKind) {
        let monitor = ProgressMonitor::new(self.monitor_options);
        let process_id = job.process_id;
        tracing::info!(process_id = %process_id, job = %kind, transport = %self.monitor_options.transport, "Following job");

        let task_monitor = monitor.clone();
        let api = Arc::clone(&self.api);
        let task_id = process_id.clone();
        let mut observer = ChannelObserver::new(process_id.clone(), self.events_tx.clone());
        tokio::spawn(async move {
            let outcome = task_monitor.watch(api.as_ref(), &task_id, &mut observer).await;
            tracing::debug!(process_id = %task_id, ?outcome, "Monitor finished");
        });

        self.jobs.insert(process_id, Job { kind, monitor });
    }

    async fn job_completed(&mut self, kind: JobKind, payload: ProgressPayload) -> Vec<String> {
        match kind {
            JobKind::Download { filename } => {
                let mut lines = vec!["Download complete!".to_string()];
                lines.extend(self.select(&filename).await);
                lines
            }
            JobKind::Process {
                download_url,
                ..
            } => {
                let mut lines = vec!["Video processed successfully!".to_string()];
                let link = payload.download_url.or(download_url);
                if let Some(link) = link {
                    match self.api.resolve(&link) {
                        Ok(url) => lines.push(format!("Download processed videos: {url}")),
                        Err(e) => lines.push(format!("Error: {e}")),
                    }
                }
                lines
            }
        }
    }
}

fn core_error(e: &CoreError) -> String {
    format!("Error: {}", e.message())
}

fn describe(rect: PixelRect) -> String {
    format!(
        "x={} y={} width={} height={}",
        rect.x, rect.y, rect.width, rect.height
    )
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
