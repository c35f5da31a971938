use std::{io::BufRead, str::FromStr, sync::Arc, time::Duration};

use media_sections_core::{
    AppConfig, CallLog, ExportTask, HeadlessAudio, HeadlessPermissions, HeadlessVideo,
    ImageExporter, ImageSource, JournalMediaIndex, MediaIndex, Notice, PermissionGate,
    PlatformErrorInfo, ResourceKind, Section, SectionController, SectionsError,
    TracingMediaIndex, permission::{PERMISSION_DENIED, PERMISSION_GRANTED},
};

/// One line of shell input.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Select(Section),
    Toggle,
    Play,
    Stop,
    Restart,
    Save,
    Prepared(ResourceKind),
    Completed(ResourceKind),
    Error(ResourceKind, PlatformErrorInfo),
    Tick(Duration),
    Permissions { granted: bool },
    Background,
    Foreground,
    Status,
    Quit,
}

impl FromStr for ShellCommand {
    type Err = SectionsError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(SectionsError::msg("empty command"));
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb, args.as_slice()) {
            ("select", [section]) => ShellCommand::Select(section.parse()?),
            ("toggle", []) => ShellCommand::Toggle,
            ("play", []) => ShellCommand::Play,
            ("stop", []) => ShellCommand::Stop,
            ("restart", []) => ShellCommand::Restart,
            ("save", []) => ShellCommand::Save,
            ("prepared", [kind]) => ShellCommand::Prepared(kind.parse()?),
            ("complete", [kind]) => ShellCommand::Completed(kind.parse()?),
            ("error", [kind, what, extra]) => ShellCommand::Error(
                kind.parse()?,
                PlatformErrorInfo::new(parse_number(what)?, parse_number(extra)?),
            ),
            ("tick", [millis]) => {
                ShellCommand::Tick(Duration::from_millis(parse_number(millis)?))
            }
            ("permissions", ["grant"]) => ShellCommand::Permissions { granted: true },
            ("permissions", ["deny"]) => ShellCommand::Permissions { granted: false },
            ("background", []) => ShellCommand::Background,
            ("foreground", []) => ShellCommand::Foreground,
            ("status", []) => ShellCommand::Status,
            ("quit" | "exit", []) => ShellCommand::Quit,
            _ => return Err(SectionsError::msg(format!("unrecognised command `{line}`"))),
        };
        Ok(command)
    }
}

fn parse_number<T: FromStr>(value: &str) -> media_sections_core::Result<T> {
    value
        .parse()
        .map_err(|_| SectionsError::msg(format!("`{value}` is not a number")))
}

/// Application shell: routes UI events to the controller and owns the
/// permission gate and the image exporter.
pub struct Shell {
    controller: SectionController,
    gate: PermissionGate,
    permissions: HeadlessPermissions,
    exporter: Arc<ImageExporter>,
    image: ImageSource,
    pending_export: Option<ExportTask>,
    log: CallLog,
    notices: Vec<Notice>,
}

impl Shell {
    /// Starts on the video section and asks for any missing permission.
    pub fn new(config: &AppConfig) -> Self {
        let log = CallLog::new();
        let controller = SectionController::new(
            config,
            Box::new(HeadlessVideo::new(log.clone())),
            Box::new(HeadlessAudio::new(log.clone())),
        );

        let index: Box<dyn MediaIndex> = match &config.export.media_index {
            Some(path) => Box::new(JournalMediaIndex::new(path.clone())),
            None => Box::new(TracingMediaIndex),
        };

        let gate = PermissionGate::new();
        let mut permissions = HeadlessPermissions::new(config.permissions.sdk_level);
        let requested = gate.request_missing(&mut permissions);
        if !requested.is_empty() {
            tracing::info!(?requested, "requesting permissions");
        }

        let mut shell = Self {
            controller,
            gate,
            permissions,
            exporter: Arc::new(ImageExporter::new(&config.export, index)),
            image: ImageSource::File(config.assets.image_path.clone()),
            pending_export: None,
            log,
            notices: Vec::new(),
        };
        shell.collect_controller_notices();
        shell
    }

    pub fn controller(&self) -> &SectionController {
        &self.controller
    }

    /// Platform calls made so far by the headless backends.
    pub fn call_log(&self) -> &CallLog {
        &self.log
    }

    /// Applies one command. Returns `false` once the shell should exit.
    pub fn handle(&mut self, command: ShellCommand) -> bool {
        tracing::debug!(?command, "handling shell command");
        match command {
            ShellCommand::Select(section) => {
                self.controller.select_section(section);
            }
            ShellCommand::Toggle => {
                self.controller.toggle_video();
            }
            ShellCommand::Play => {
                self.controller.play_music();
            }
            ShellCommand::Stop => self.controller.stop_music(),
            ShellCommand::Restart => {
                self.controller.restart_music();
            }
            ShellCommand::Save => self.start_export(),
            ShellCommand::Prepared(kind) => self.controller.on_resource_prepared(kind),
            ShellCommand::Completed(kind) => self.controller.on_resource_completed(kind),
            ShellCommand::Error(kind, info) => self.controller.on_resource_error(kind, info),
            ShellCommand::Tick(delta) => self.controller.tick(delta),
            ShellCommand::Permissions { granted } => self.answer_permissions(granted),
            ShellCommand::Background => {
                self.controller.teardown_all();
            }
            ShellCommand::Foreground => self.controller.resume(),
            ShellCommand::Status => {
                let status = self.status_line();
                self.notices.push(Notice::short(status));
            }
            ShellCommand::Quit => {
                self.shutdown();
                return false;
            }
        }
        self.poll_export();
        self.collect_controller_notices();
        true
    }

    /// Feeds `input` line by line until `quit`, end of input or a read
    /// error. Resources are released before returning in every case, and
    /// each notice is handed to `sink` as soon as it is produced.
    pub fn run_lines<R: BufRead>(
        &mut self,
        input: R,
        mut sink: impl FnMut(Notice),
    ) -> media_sections_core::Result<()> {
        self.take_notices().into_iter().for_each(&mut sink);
        let outcome = self.feed(input, &mut sink);
        self.shutdown();
        self.take_notices().into_iter().for_each(&mut sink);
        outcome
    }

    fn feed<R: BufRead>(
        &mut self,
        input: R,
        sink: &mut impl FnMut(Notice),
    ) -> media_sections_core::Result<()> {
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.parse::<ShellCommand>() {
                Ok(command) => {
                    let keep_going = self.handle(command);
                    self.take_notices().into_iter().for_each(&mut *sink);
                    if !keep_going {
                        break;
                    }
                }
                Err(err) => tracing::warn!(%err, "skipping input line"),
            }
        }
        Ok(())
    }

    /// Drains notices produced since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Waits for a pending export and releases every resource.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.pending_export.take() {
            self.finish_export(task);
        }
        self.controller.teardown_all();
        self.collect_controller_notices();
    }

    pub fn status_line(&self) -> String {
        let active: Vec<String> = self
            .controller
            .active_resources()
            .iter()
            .map(ToString::to_string)
            .collect();
        format!(
            "section={} video={:?} music={} animation_y={:.1} running=[{}]",
            self.controller.active(),
            self.controller.video().state(),
            if self.controller.music().is_playing() { "playing" } else { "idle" },
            self.controller.animation().translation_y(),
            active.join(",")
        )
    }

    fn start_export(&mut self) {
        if let Some(task) = self.pending_export.take() {
            self.finish_export(task);
        }
        self.pending_export = Some(self.exporter.spawn(self.image.clone()));
    }

    fn poll_export(&mut self) {
        if self
            .pending_export
            .as_ref()
            .is_some_and(|task| task.is_finished())
        {
            if let Some(task) = self.pending_export.take() {
                self.finish_export(task);
            }
        }
    }

    fn finish_export(&mut self, task: ExportTask) {
        let notice = match task.wait() {
            Ok(path) => {
                tracing::info!(path = %path.display(), "image saved");
                Notice::short("Image saved to Pictures")
            }
            Err(err) => Notice::long(format!("Error: {err}")),
        };
        self.notices.push(notice);
    }

    fn answer_permissions(&mut self, granted: bool) {
        let Some((code, requested)) = self.permissions.take_pending_request() else {
            tracing::debug!("no permission request is pending");
            return;
        };
        let ids: Vec<&str> = requested.iter().map(|permission| permission.id()).collect();
        let grant = if granted {
            PERMISSION_GRANTED
        } else {
            PERMISSION_DENIED
        };
        let grants = vec![grant; ids.len()];

        if granted {
            for permission in &requested {
                self.permissions.grant(*permission);
            }
        }
        if let Some(outcome) = self.gate.on_result(code, &ids, &grants) {
            self.notices.push(outcome.notice());
        }
    }

    fn collect_controller_notices(&mut self) {
        self.notices.extend(self.controller.take_notices());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_sections_core::VideoState;

    fn config(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.export.pictures_dir = dir.join("Pictures");
        config.assets.image_path = dir.join("gato.png");
        config
    }

    fn write_image(path: &std::path::Path) {
        image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            "select music".parse::<ShellCommand>().unwrap(),
            ShellCommand::Select(Section::Music)
        );
        assert_eq!(
            "error video 1 -1004".parse::<ShellCommand>().unwrap(),
            ShellCommand::Error(ResourceKind::Video, PlatformErrorInfo::new(1, -1004))
        );
        assert_eq!(
            "tick 16".parse::<ShellCommand>().unwrap(),
            ShellCommand::Tick(Duration::from_millis(16))
        );
        assert!("select gallery".parse::<ShellCommand>().is_err());
        assert!("tick soon".parse::<ShellCommand>().is_err());
        assert!("".parse::<ShellCommand>().is_err());
    }

    #[test]
    fn startup_requests_permissions_and_shows_video() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new(&config(dir.path()));

        assert_eq!(shell.controller().active(), Section::Video);
        assert!(shell.handle(ShellCommand::Permissions { granted: false }));
        let notices = shell.take_notices();
        assert_eq!(notices.last().unwrap().message, "Permissions denied");
    }

    #[test]
    fn plays_video_then_switches_to_music() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new(&config(dir.path()));

        shell.handle(ShellCommand::Toggle);
        assert_eq!(shell.controller().video().state(), VideoState::Preparing);

        shell.handle(ShellCommand::Prepared(ResourceKind::Video));
        shell.handle(ShellCommand::Toggle);
        assert_eq!(shell.controller().video().state(), VideoState::Playing);

        shell.handle(ShellCommand::Select(Section::Music));
        shell.handle(ShellCommand::Play);
        assert_eq!(shell.controller().active_resources(), vec![ResourceKind::Audio]);
        assert!(shell.call_log().contains("video:stop"));
    }

    #[test]
    fn save_writes_image_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        write_image(&config.assets.image_path);
        let mut shell = Shell::new(&config);
        shell.take_notices();

        shell.handle(ShellCommand::Select(Section::Image));
        shell.handle(ShellCommand::Save);
        assert!(!shell.handle(ShellCommand::Quit));

        let notices = shell.take_notices();
        assert!(notices.iter().any(|notice| notice.message == "Image saved to Pictures"));
        let saved = std::fs::read_dir(dir.path().join("Pictures")).unwrap().count();
        assert_eq!(saved, 1);
    }

    #[test]
    fn save_without_bundled_image_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new(&config(dir.path()));
        shell.take_notices();

        shell.handle(ShellCommand::Save);
        shell.shutdown();

        let notices = shell.take_notices();
        assert!(notices.iter().any(|notice| notice.message.starts_with("Error:")));
    }

    struct BrokenPipe;

    impl std::io::Read for BrokenPipe {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "input closed"))
        }
    }

    #[test]
    fn read_error_still_releases_resources() {
        use std::io::{BufReader, Cursor, Read};

        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new(&config(dir.path()));
        let input = BufReader::new(Cursor::new("select music\nplay\n").chain(BrokenPipe));

        let outcome = shell.run_lines(input, |_| {});

        assert!(outcome.is_err());
        assert!(shell.call_log().contains("audio:start"));
        assert!(!shell.controller().music().is_created());
        assert_eq!(shell.controller().video().state(), VideoState::Uninitialized);
        assert!(shell.controller().active_resources().is_empty());
    }

    #[test]
    fn quit_stops_reading_and_releases() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new(&config(dir.path()));
        let input = std::io::Cursor::new("select animation\nquit\nselect music\nplay\n");

        shell.run_lines(input, |_| {}).unwrap();

        assert_eq!(shell.controller().active(), Section::Animation);
        assert!(!shell.call_log().contains("audio:create res://raw/musica"));
        assert!(shell.controller().active_resources().is_empty());
    }

    #[test]
    fn background_releases_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new(&config(dir.path()));
        shell.handle(ShellCommand::Select(Section::Animation));
        shell.handle(ShellCommand::Tick(Duration::from_millis(100)));

        shell.handle(ShellCommand::Background);
        shell.handle(ShellCommand::Background);

        assert!(shell.controller().active_resources().is_empty());
        assert_eq!(shell.controller().animation().translation_y(), 0.0);
    }
}
