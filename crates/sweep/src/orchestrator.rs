use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use common::{Error, ErrorReport, Result};
use probe::{EchoTransport, Prober};
use ssh::{Failure, FailureKind, RemoteShell};
use telemetry::{LocalRadio, RemoteAntennaInfo, TelemetryParser, TemplateValues, render};

use crate::observer::{NullObserver, ScanObserver};
use crate::result::{ScanResult, ScanStatus};
use crate::settings::{ScanCombination, ScanSettings};
use crate::sink::ResultSink;
use crate::state::{BaselineSettings, ScanOutcome, ScanState};
use crate::validate::validate_interface;

const TICK: Duration = Duration::from_secs(1);

/// Why the sweep stopped before the last combination.
enum Abort {
    Cancelled,
    SessionLost(Failure),
}

/// Drives one device through validation, baseline capture, the sweep and
/// the final restore.
///
/// The orchestrator owns the shell for the whole run; commands are strictly
/// sequential.
pub struct Orchestrator<S, E> {
    settings: ScanSettings,
    shell: S,
    prober: Prober<E>,
    parser: TelemetryParser,
    observer: Arc<dyn ScanObserver>,
    sink: Option<Box<dyn ResultSink>>,
    cancel: CancellationToken,
    state: ScanState,
    baseline: Option<BaselineSettings>,
    emitted: usize,
}

impl<S: RemoteShell, E: EchoTransport> Orchestrator<S, E> {
    pub fn new(settings: ScanSettings, shell: S, prober: Prober<E>) -> Self {
        let parser = TelemetryParser::new(settings.vocabulary.clone());
        Self {
            settings,
            shell,
            prober,
            parser,
            observer: Arc::new(NullObserver),
            sink: None,
            cancel: CancellationToken::new(),
            state: ScanState::Idle,
            baseline: None,
            emitted: 0,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Give the shell back, e.g. to disconnect it.
    pub fn into_shell(self) -> S {
        self.shell
    }

    /// Run the full scan.
    ///
    /// Returns an error only when the scan cannot start: invalid settings,
    /// an unknown interface or a dead session. Once the baseline has been
    /// read, the device is always restored and the terminal state is
    /// reported through [`ScanOutcome`].
    pub async fn run(&mut self) -> Result<ScanOutcome> {
        if let Err(e) = self.settings.validate() {
            self.report(&ErrorReport::from_error("settings", &e));
            return Err(e);
        }
        self.baseline = None;
        self.emitted = 0;

        self.set_state(ScanState::ValidatingInterface);
        let interface = self.settings.interface.clone();
        let check = validate_interface(&mut self.shell, &self.settings, &interface).await;
        if let Some(lost) = self.session_lost() {
            self.set_state(ScanState::Failed);
            self.report(&lost.report);
            return Err(Error::SessionLost(lost.report.to_string()));
        }
        if !check.is_valid {
            let err = check.into_error(&interface);
            self.set_state(ScanState::Failed);
            self.report(&ErrorReport::from_error("validate interface", &err));
            return Err(err);
        }

        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.start_new_scan() {
                warn!(%e, "result sink could not start a new scan");
            }
        }

        self.set_state(ScanState::CapturingBaseline);
        let mut base = ScanResult::new(ScanStatus::Base);
        match self.collect(&mut base).await {
            Ok((radio, failed)) => {
                if let Some(failure) = failed {
                    // The record keeps its baseline tag; the restore only
                    // uses values that were actually read.
                    base.error = Some(failure.report.to_string());
                    self.report(&failure.report);
                }
                let baseline = BaselineSettings::from_radio(&radio);
                if baseline.is_empty() {
                    warn!("no baseline values read, nothing will be restored");
                    self.observer
                        .status("warning: current radio settings unknown, they will not be restored");
                } else {
                    info!(?baseline, "baseline captured");
                }
                self.baseline = Some(baseline);
                self.emit(base);
            }
            Err(lost) => {
                // Nothing was changed yet, so there is nothing to restore.
                self.report(&lost.report);
                self.set_state(ScanState::Failed);
                return Ok(self.outcome(Some(lost.report)));
            }
        }

        let (terminal, failure) = match self.sweep().await {
            Ok(()) => (ScanState::Done, None),
            Err(Abort::Cancelled) => {
                info!("scan cancelled");
                self.observer.status("scan cancelled");
                (ScanState::Cancelled, None)
            }
            Err(Abort::SessionLost(lost)) => {
                error!(report = %lost.report, "session lost, aborting sweep");
                self.report(&lost.report);
                (ScanState::Failed, Some(lost.report))
            }
        };

        self.set_state(ScanState::Restoring);
        self.restore().await;

        if terminal == ScanState::Done {
            self.observer.progress(100.0);
        }
        self.set_state(terminal);
        Ok(self.outcome(failure))
    }

    /// Read the current telemetry once, without touching the configuration.
    pub async fn query_status(&mut self) -> Result<ScanResult> {
        let mut result = ScanResult::new(ScanStatus::Status);
        match self.collect(&mut result).await {
            Ok((_, Some(failure))) => result.fail(failure.report.to_string()),
            Ok((_, None)) => {}
            Err(lost) => {
                self.report(&lost.report);
                return Err(Error::SessionLost(lost.report.to_string()));
            }
        }
        self.observer.result(&result);
        Ok(result)
    }

    async fn sweep(&mut self) -> std::result::Result<(), Abort> {
        let combinations = self.settings.combinations();
        let total = combinations.len();
        info!(total, "starting sweep");

        for (i, combo) in combinations.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(Abort::Cancelled);
            }
            self.set_state(ScanState::Sweeping {
                index: i + 1,
                total,
            });

            let result = self.scan_combination(combo).await?;
            self.emit(result);
            self.observer
                .progress((i + 1) as f64 / total as f64 * 100.0);
        }

        Ok(())
    }

    async fn scan_combination(
        &mut self,
        combo: &ScanCombination,
    ) -> std::result::Result<ScanResult, Abort> {
        let mut result = ScanResult::for_combination(combo);
        info!(
            frequency = combo.frequency,
            protocol = ?combo.protocol,
            channel_width = ?combo.channel_width,
            "applying combination"
        );

        let values =
            TemplateValues::new(&self.settings.interface).frequency(f64::from(combo.frequency));
        let command = self.render(&self.settings.templates.set_frequency, &values);
        match self.send(&command, self.settings.command_timeout()).await {
            Err(failure) if failure.kind == FailureKind::Reconnect => {
                return Err(Abort::SessionLost(failure));
            }
            Err(failure) => {
                warn!(frequency = combo.frequency, report = %failure.report, "set frequency failed");
                result.fail(failure.report.to_string());
                return Ok(result);
            }
            Ok(response) if self.parser.contains_failure(&response) => {
                warn!(frequency = combo.frequency, response, "device rejected frequency");
                result.fail(response);
                return Ok(result);
            }
            Ok(_) => {}
        }

        if let Some(protocol) = &combo.protocol {
            let values = TemplateValues::new(&self.settings.interface).protocol(protocol);
            let command = self.render(&self.settings.templates.set_protocol, &values);
            self.apply_setting(&command).await?;
        }
        if let Some(width) = &combo.channel_width {
            let values = TemplateValues::new(&self.settings.interface).channel_width(width);
            let command = self.render(&self.settings.templates.set_channel_width, &values);
            self.apply_setting(&command).await?;
        }

        if !self.stabilize().await {
            return Err(Abort::Cancelled);
        }

        let (_, failed) = self
            .collect(&mut result)
            .await
            .map_err(Abort::SessionLost)?;
        if let Some(failure) = failed {
            warn!(frequency = combo.frequency, report = %failure.report, "collection failed");
            result.fail(failure.report.to_string());
        }
        Ok(result)
    }

    /// A secondary set command. Rejections are logged; the combination is
    /// still measured.
    async fn apply_setting(&mut self, command: &str) -> std::result::Result<(), Abort> {
        match self.send(command, self.settings.command_timeout()).await {
            Err(failure) if failure.kind == FailureKind::Reconnect => {
                Err(Abort::SessionLost(failure))
            }
            Err(failure) => {
                warn!(command, report = %failure.report, "set command failed");
                Ok(())
            }
            Ok(response) => {
                if self.parser.contains_failure(&response) {
                    warn!(command, response, "device rejected setting");
                }
                Ok(())
            }
        }
    }

    /// Wait out the stabilization period one tick at a time. Returns `false`
    /// when cancelled.
    async fn stabilize(&self) -> bool {
        let ticks = self.settings.stabilization().as_secs_f64().ceil() as u64;
        debug!(ticks, "stabilizing");

        for remaining in (1..=ticks).rev() {
            if self.cancel.is_cancelled() {
                return false;
            }
            if remaining == ticks || remaining % 10 == 0 {
                self.observer
                    .status(&format!("stabilizing, {remaining}s remaining"));
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                _ = tokio::time::sleep(TICK) => {}
            }
        }

        !self.cancel.is_cancelled()
    }

    /// Read interface info, the registration table and the live monitor,
    /// merge them into `result` and probe the link.
    ///
    /// Fails only when the session is gone. Any other transport failure is
    /// returned alongside the radio reading; whatever did parse is kept.
    async fn collect(
        &mut self,
        result: &mut ScanResult,
    ) -> std::result::Result<(LocalRadio, Option<Failure>), Failure> {
        let interface = self.settings.interface.clone();
        let values = TemplateValues::new(&interface);
        let mut failed = None;

        let command = self.render(&self.settings.templates.interface_info, &values);
        let mut info = self.query(&command, &mut failed).await?;
        if info.is_empty() {
            let primary = failed.take();
            let command = self.render(&self.settings.templates.interface_info_fallback, &values);
            info = self.query(&command, &mut failed).await?;
            if info.is_empty() && failed.is_none() {
                failed = primary;
            }
        }

        let command = self.render(&self.settings.templates.registration_table, &values);
        let registration = self.query(&command, &mut failed).await?;

        let command = self.render(&self.settings.templates.monitor, &values);
        let monitor = self.query(&command, &mut failed).await?;

        let mut radio = LocalRadio::parse(&self.parser, &info);
        radio.merge_monitor(LocalRadio::parse(&self.parser, &monitor));
        result.apply_local(&radio);
        result.remote = RemoteAntennaInfo::parse(&self.parser, &registration);

        if let Some(target) = self.ping_target(&result.remote) {
            let stats = self
                .prober
                .probe(
                    target,
                    self.settings.ping_count,
                    self.settings.ping_timeout(),
                    &self.cancel,
                )
                .await;
            result.ping = Some(stats);
        }

        Ok((radio, failed))
    }

    /// Put back every baseline value that was read. Failures are logged and
    /// the remaining restores still run.
    async fn restore(&mut self) {
        let Some(baseline) = self.baseline.clone() else {
            return;
        };
        let interface = self.settings.interface.clone();
        let templates = self.settings.templates.clone();

        let mut commands = Vec::new();
        if let Some(mhz) = baseline.frequency {
            let values = TemplateValues::new(&interface).frequency(mhz);
            commands.push(self.render(&templates.set_frequency, &values));
        }
        if let Some(protocol) = &baseline.protocol {
            let values = TemplateValues::new(&interface).protocol(protocol);
            commands.push(self.render(&templates.set_protocol, &values));
        }
        if let Some(width) = &baseline.channel_width {
            let values = TemplateValues::new(&interface).channel_width(width);
            commands.push(self.render(&templates.set_channel_width, &values));
        }

        info!(count = commands.len(), "restoring baseline");
        for command in commands {
            match self.send(&command, self.settings.command_timeout()).await {
                Err(failure) => {
                    error!(command, report = %failure.report, "restore failed");
                    self.report(&ErrorReport::new("restore", failure.report.to_string()));
                }
                Ok(response) if self.parser.contains_failure(&response) => {
                    error!(command, response, "device rejected restore");
                    self.report(&ErrorReport::new("restore", response));
                }
                Ok(_) => {}
            }
        }
    }

    fn ping_target(&self, remote: &RemoteAntennaInfo) -> Option<IpAddr> {
        self.settings.ping_target.or_else(|| {
            remote
                .last_ip
                .as_deref()
                .and_then(|ip| ip.parse::<IpAddr>().ok())
        })
    }

    /// A telemetry query. Transport failures other than a lost session read
    /// as empty output; the first one is kept in `failed`.
    async fn query(
        &mut self,
        command: &str,
        failed: &mut Option<Failure>,
    ) -> std::result::Result<String, Failure> {
        match self.send(command, self.settings.query_timeout()).await {
            Ok(output) => Ok(output),
            Err(failure) if failure.kind == FailureKind::Reconnect => Err(failure),
            Err(failure) => {
                warn!(command, report = %failure.report, "query failed");
                failed.get_or_insert(failure);
                Ok(String::new())
            }
        }
    }

    async fn send(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> std::result::Result<String, Failure> {
        self.observer.trace(&format!("> {command}"));
        let response = self.shell.send_command(command, timeout).await;

        if response.is_empty() {
            if let Some(failure) = self.shell.last_failure() {
                self.observer.trace(&format!("! {}", failure.report));
                return Err(failure.clone());
            }
        }
        for line in response.lines() {
            self.observer.trace(&format!("< {line}"));
        }
        Ok(response)
    }

    fn render(&self, template: &str, values: &TemplateValues<'_>) -> String {
        render(template, values, &self.settings.vocabulary.placeholders)
    }

    fn session_lost(&self) -> Option<Failure> {
        self.shell
            .last_failure()
            .filter(|f| f.kind == FailureKind::Reconnect)
            .cloned()
    }

    fn emit(&mut self, result: ScanResult) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.save_result(&result, &self.settings) {
                warn!(%e, "failed to save result");
            }
        }
        self.observer.result(&result);
        self.emitted += 1;
    }

    fn set_state(&mut self, state: ScanState) {
        debug!(%state, "state change");
        self.state = state;
        self.observer.state_changed(state);
        self.observer.status(&state.to_string());
    }

    fn report(&self, report: &ErrorReport) {
        self.observer.error(report);
    }

    fn outcome(&self, failure: Option<ErrorReport>) -> ScanOutcome {
        ScanOutcome {
            state: self.state,
            emitted: self.emitted,
            baseline: self.baseline.clone(),
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::ScanEvent;
    use crate::sink::MemorySink;
    use crate::testing::{FakeEcho, ScriptedShell, SilentEcho};
    use tokio::sync::mpsc;

    const TERSE: &str = r#" 0  R name="wlan1" mtu=1500 mac-address=4C:5E:0C:7F:D4:B1
 1  X name="wlan2" mtu=1500 mac-address=4C:5E:0C:7F:D4:B2
"#;

    const INTERFACE_INFO: &str = r#" 0  R name="wlan1" mtu=1500 mode=station-bridge band=5ghz-a/n
      channel-width=20mhz frequency=5180 wireless-protocol=nv2 tx-rate=24Mbps
"#;

    const REGISTRATION: &str = r#" 0 interface=wlan1 radio-name="NTK O" mac-address=4C:5E:0C:7F:D4:B1
      signal-strength=-70dBm@6Mbps tx-ccq=90% packets=100,200 last-ip=10.0.0.2
"#;

    const MONITOR: &str = r#"         signal-strength: -68dBm
             noise-floor: -104dBm
          overall-tx-ccq: 88%
"#;

    fn device() -> ScriptedShell {
        ScriptedShell::new()
            .respond("print terse", TERSE)
            .respond("print detail where name=", INTERFACE_INFO)
            .respond("registration-table", REGISTRATION)
            .respond("monitor wlan1", MONITOR)
    }

    fn settings() -> ScanSettings {
        ScanSettings {
            host: "192.168.88.1".into(),
            start_frequency: 5200,
            end_frequency: 5220,
            step: 20,
            protocols: vec!["802.11".into()],
            stabilization_minutes: 0.05,
            ..ScanSettings::default()
        }
    }

    fn orchestrator(
        settings: ScanSettings,
        shell: ScriptedShell,
    ) -> Orchestrator<ScriptedShell, FakeEcho> {
        Orchestrator::new(settings, shell, Prober::new(FakeEcho::new(12)))
    }

    fn is_set(cmd: &str) -> bool {
        cmd.contains(" set ")
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_sweep() {
        let shell = device();
        let log = shell.log();
        let sink = MemorySink::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut scan = orchestrator(settings(), shell)
            .with_sink(Box::new(sink.clone()))
            .with_observer(Arc::new(tx));
        let outcome = scan.run().await.unwrap();

        assert_eq!(outcome.state, ScanState::Done);
        assert_eq!(outcome.emitted, 3);
        assert_eq!(outcome.failure, None);
        assert_eq!(
            outcome.baseline,
            Some(BaselineSettings {
                frequency: Some(5180.0),
                protocol: Some("nv2".into()),
                channel_width: Some("20mhz".into()),
            })
        );

        let results = sink.results();
        assert_eq!(sink.scan_count(), 1);
        let statuses: Vec<ScanStatus> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![ScanStatus::Base, ScanStatus::Success, ScanStatus::Success]
        );
        assert_eq!(results[0].frequency, Some(5180.0));
        assert_eq!(results[1].frequency, Some(5200.0));
        assert_eq!(results[2].frequency, Some(5220.0));

        let first = &results[1];
        assert_eq!(first.signal_strength, Some(-68.0));
        assert_eq!(first.noise_floor, Some(-104.0));
        assert_eq!(first.snr, Some(36.0));
        assert_eq!(first.ccq, Some(88.0));
        assert_eq!(first.band.as_deref(), Some("5ghz-a/n"));
        assert_eq!(first.remote.radio_name.as_deref(), Some("NTK O"));
        assert_eq!(first.remote.signal_strength, Some(-70.0));
        assert_eq!(first.remote.packets.tx, Some(200));

        let ping = first.ping.as_ref().unwrap();
        assert_eq!(ping.sent, 4);
        assert_eq!(ping.avg_ms, Some(12));

        let sent = log.lock().unwrap().clone();
        assert_eq!(sent[0], "/interface wireless print terse");
        let sets: Vec<&str> = sent.iter().map(String::as_str).filter(|c| is_set(c)).collect();
        assert_eq!(
            sets,
            vec![
                "/interface wireless set wlan1 frequency=5200",
                "/interface wireless set wlan1 wireless-protocol=802.11",
                "/interface wireless set wlan1 frequency=5220",
                "/interface wireless set wlan1 wireless-protocol=802.11",
                "/interface wireless set wlan1 frequency=5180",
                "/interface wireless set wlan1 wireless-protocol=nv2",
                "/interface wireless set wlan1 channel-width=20mhz",
            ]
        );

        let mut progress = Vec::new();
        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                ScanEvent::Progress(p) => progress.push(p),
                ScanEvent::State(s) => states.push(s),
                _ => {}
            }
        }
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last().copied(), Some(100.0));
        assert_eq!(states.first(), Some(&ScanState::ValidatingInterface));
        assert!(states.contains(&ScanState::Sweeping { index: 2, total: 2 }));
        assert_eq!(
            &states[states.len() - 2..],
            &[ScanState::Restoring, ScanState::Done]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_frequency_skips_collection() {
        let shell = ScriptedShell::new()
            .respond("frequency=5200", "failure: invalid value for argument frequency")
            .respond("print terse", TERSE)
            .respond("print detail where name=", INTERFACE_INFO)
            .respond("registration-table", REGISTRATION)
            .respond("monitor wlan1", MONITOR);
        let log = shell.log();
        let sink = MemorySink::new();

        let mut scan = orchestrator(settings(), shell).with_sink(Box::new(sink.clone()));
        let outcome = scan.run().await.unwrap();
        assert_eq!(outcome.state, ScanState::Done);

        let results = sink.results();
        assert_eq!(results.len(), 3);
        let rejected = &results[1];
        assert_eq!(rejected.status, ScanStatus::Error);
        assert_eq!(
            rejected.error.as_deref(),
            Some("failure: invalid value for argument frequency")
        );
        assert_eq!(rejected.remote, RemoteAntennaInfo::default());
        assert_eq!(rejected.ping, None);
        assert_eq!(results[2].status, ScanStatus::Success);

        // Nothing between the rejected set and the next frequency.
        let sent = log.lock().unwrap().clone();
        let at = sent.iter().position(|c| c.ends_with("frequency=5200")).unwrap();
        assert!(sent[at + 1].ends_with("frequency=5220"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_only_recorded_values() {
        let shell = ScriptedShell::new()
            .respond("print terse", TERSE)
            .respond("print detail where name=", "name=\"wlan1\" frequency=5745\n")
            .respond("registration-table", "")
            .respond("monitor wlan1", "");
        let log = shell.log();

        let mut scan = orchestrator(settings(), shell);
        let outcome = scan.run().await.unwrap();
        assert_eq!(
            outcome.baseline,
            Some(BaselineSettings {
                frequency: Some(5745.0),
                protocol: None,
                channel_width: None,
            })
        );

        let sent = log.lock().unwrap().clone();
        assert_eq!(
            sent.last().map(String::as_str),
            Some("/interface wireless set wlan1 frequency=5745")
        );
        assert!(!sent.iter().any(|c| c.contains("channel-width=")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_continues_after_failure() {
        let shell = ScriptedShell::new()
            .respond("frequency=5180", "failure: device busy")
            .respond("print terse", TERSE)
            .respond("print detail where name=", INTERFACE_INFO);
        let log = shell.log();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut scan = orchestrator(settings(), shell).with_observer(Arc::new(tx));
        scan.run().await.unwrap();

        let sent = log.lock().unwrap().clone();
        let tail: Vec<&str> = sent[sent.len() - 3..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "/interface wireless set wlan1 frequency=5180",
                "/interface wireless set wlan1 wireless-protocol=nv2",
                "/interface wireless set wlan1 channel-width=20mhz",
            ]
        );

        let mut errors = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ScanEvent::Error(report) = event {
                errors.push(report);
            }
        }
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].context, "restore");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_baseline_restores_nothing() {
        let shell = ScriptedShell::new().respond("print terse", TERSE);
        let log = shell.log();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut scan = orchestrator(settings(), shell).with_observer(Arc::new(tx));
        let outcome = scan.run().await.unwrap();
        assert_eq!(outcome.state, ScanState::Done);
        assert_eq!(outcome.baseline, Some(BaselineSettings::default()));

        let sent = log.lock().unwrap().clone();
        assert!(sent.last().unwrap().contains("monitor wlan1"));

        let mut warned = false;
        while let Ok(event) = rx.try_recv() {
            if let ScanEvent::Status(text) = event {
                warned |= text.contains("will not be restored");
            }
        }
        assert!(warned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_stabilization() {
        let cancel = CancellationToken::new();
        let shell = ScriptedShell::new()
            .respond("print terse", TERSE)
            .respond("print detail where name=", INTERFACE_INFO);
        let log = shell.log();
        let sink = MemorySink::new();

        let mut scan = orchestrator(
            ScanSettings {
                stabilization_minutes: 1.0,
                ..settings()
            },
            shell,
        )
        .with_cancel(cancel.clone())
        .with_sink(Box::new(sink.clone()));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });

        let start = tokio::time::Instant::now();
        let outcome = scan.run().await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(outcome.state, ScanState::Cancelled);
        assert!(elapsed <= Duration::from_millis(3500), "took {elapsed:?}");
        // Only the baseline was emitted.
        assert_eq!(outcome.emitted, 1);
        assert_eq!(sink.results().len(), 1);

        let sent = log.lock().unwrap().clone();
        let set_at = sent.iter().position(|c| c.ends_with("frequency=5200")).unwrap();
        let after: Vec<&String> = sent[set_at + 1..].iter().collect();
        assert!(after.iter().all(|c| is_set(c)), "collected after cancel: {after:?}");
        assert!(sent.last().unwrap().ends_with("channel-width=20mhz"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_at_combination_boundary() {
        let cancel = CancellationToken::new();
        let shell = device().cancel_on("monitor wlan1", cancel.clone());
        let log = shell.log();

        let mut scan = orchestrator(settings(), shell).with_cancel(cancel);
        let outcome = scan.run().await.unwrap();

        // Tripped during baseline collection: the sweep never sets anything.
        assert_eq!(outcome.state, ScanState::Cancelled);
        assert_eq!(outcome.emitted, 1);
        let sent = log.lock().unwrap().clone();
        assert!(!sent.iter().any(|c| c.ends_with("frequency=5200")));
        assert!(sent.iter().any(|c| c.ends_with("frequency=5180")));
    }

    #[tokio::test]
    async fn test_unknown_interface_does_not_start() {
        let shell = ScriptedShell::new().respond("print terse", TERSE);
        let log = shell.log();
        let sink = MemorySink::new();

        let mut scan = orchestrator(
            ScanSettings {
                interface: "wlan9".into(),
                ..settings()
            },
            shell,
        )
        .with_sink(Box::new(sink.clone()));

        match scan.run().await {
            Err(Error::InterfaceNotFound {
                interface,
                available,
            }) => {
                assert_eq!(interface, "wlan9");
                assert_eq!(available, vec!["wlan1", "wlan2"]);
            }
            other => panic!("expected InterfaceNotFound, got {other:?}"),
        }
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(sink.scan_count(), 0);
        assert_eq!(scan.state(), ScanState::Failed);
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected() {
        let mut scan = orchestrator(
            ScanSettings {
                step: 0,
                ..settings()
            },
            device(),
        );
        assert!(matches!(scan.run().await, Err(Error::Config(_))));
        assert_eq!(scan.state(), ScanState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_loss_aborts_sweep() {
        let shell = ScriptedShell::new()
            .fail("frequency=5220", FailureKind::Reconnect)
            .respond("print terse", TERSE)
            .respond("print detail where name=", INTERFACE_INFO)
            .respond("registration-table", REGISTRATION)
            .respond("monitor wlan1", MONITOR);
        let log = shell.log();

        let mut scan = orchestrator(settings(), shell);
        let outcome = scan.run().await.unwrap();

        assert_eq!(outcome.state, ScanState::Failed);
        assert_eq!(outcome.emitted, 2);
        let failure = outcome.failure.unwrap();
        assert!(failure.message.contains("session lost"));

        // Restore is still attempted.
        let sent = log.lock().unwrap().clone();
        assert!(sent.last().unwrap().ends_with("channel-width=20mhz"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_on_set_is_error_result() {
        let shell = ScriptedShell::new()
            .fail("frequency=5200", FailureKind::Timeout)
            .respond("print terse", TERSE)
            .respond("print detail where name=", INTERFACE_INFO);
        let sink = MemorySink::new();

        let mut scan = orchestrator(settings(), shell).with_sink(Box::new(sink.clone()));
        let outcome = scan.run().await.unwrap();

        assert_eq!(outcome.state, ScanState::Done);
        let results = sink.results();
        assert_eq!(results[1].status, ScanStatus::Error);
        assert!(results[1].error.as_deref().unwrap().contains("timed out"));
        assert_eq!(results[2].status, ScanStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collection_timeout_is_error_result() {
        let shell = ScriptedShell::new()
            .fail("registration-table", FailureKind::Timeout)
            .respond("print terse", TERSE)
            .respond("print detail where name=", INTERFACE_INFO)
            .respond("monitor wlan1", MONITOR);
        let sink = MemorySink::new();

        let mut scan = orchestrator(settings(), shell).with_sink(Box::new(sink.clone()));
        let outcome = scan.run().await.unwrap();
        assert_eq!(outcome.state, ScanState::Done);

        let results = sink.results();
        assert_eq!(results.len(), 3);

        // The baseline keeps its tag and still drives the restore.
        assert_eq!(results[0].status, ScanStatus::Base);
        assert!(results[0].error.as_deref().unwrap().contains("registration-table"));
        assert_eq!(outcome.baseline.unwrap().frequency, Some(5180.0));

        for swept in &results[1..] {
            assert_eq!(swept.status, ScanStatus::Error);
            assert!(swept.error.as_deref().unwrap().contains("timed out"));
            // What did parse is kept.
            assert_eq!(swept.signal_strength, Some(-68.0));
            assert_eq!(swept.remote, RemoteAntennaInfo::default());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_with_failed_query_is_error() {
        let shell = ScriptedShell::new()
            .respond("print detail where name=", INTERFACE_INFO)
            .fail("monitor wlan1", FailureKind::Channel);
        let mut scan = orchestrator(settings(), shell);

        let status = scan.query_status().await.unwrap();
        assert_eq!(status.status, ScanStatus::Error);
        assert_eq!(status.frequency, Some(5180.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_ping() {
        let cancel = CancellationToken::new();
        let mut scan = Orchestrator::new(settings(), device(), Prober::new(SilentEcho))
            .with_cancel(cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(6)).await;
            trigger.cancel();
        });

        let start = tokio::time::Instant::now();
        let outcome = scan.run().await.unwrap();
        let elapsed = start.elapsed();

        // The baseline ping is cut short; four silent echoes would take 20s.
        assert_eq!(outcome.state, ScanState::Cancelled);
        assert!(elapsed < Duration::from_millis(6100), "took {elapsed:?}");
        assert_eq!(outcome.emitted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_only_when_primary_empty() {
        let shell = ScriptedShell::new()
            .respond("default-name=", "name=\"wlan1\" frequency=5500 band=5ghz-n/ac\n");
        let log = shell.log();
        let mut scan = orchestrator(settings(), shell);

        let status = scan.query_status().await.unwrap();
        assert_eq!(status.status, ScanStatus::Status);
        assert_eq!(status.frequency, Some(5500.0));
        assert_eq!(status.band.as_deref(), Some("5ghz-n/ac"));
        assert!(log.lock().unwrap().iter().any(|c| c.contains("default-name=")));

        let shell = device();
        let log = shell.log();
        let mut scan = orchestrator(settings(), shell);
        scan.query_status().await.unwrap();
        assert!(!log.lock().unwrap().iter().any(|c| c.contains("default-name=")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_ping_target_wins() {
        let echo = FakeEcho::new(3);
        let targets = Arc::clone(&echo.targets);
        let mut scan = Orchestrator::new(
            ScanSettings {
                ping_target: Some("10.9.9.9".parse().unwrap()),
                ping_count: 2,
                ..settings()
            },
            device(),
            Prober::new(echo),
        );

        let status = scan.query_status().await.unwrap();
        assert_eq!(status.ping.unwrap().received, 2);
        let targets = targets.lock().unwrap().clone();
        assert!(targets.iter().all(|t| t.to_string() == "10.9.9.9"));
    }

    #[tokio::test]
    async fn test_no_ping_without_target() {
        let shell = ScriptedShell::new().respond("print detail where name=", INTERFACE_INFO);
        let mut scan = orchestrator(settings(), shell);
        let status = scan.query_status().await.unwrap();
        assert_eq!(status.ping, None);
        assert_eq!(status.snr, None);
    }
}
