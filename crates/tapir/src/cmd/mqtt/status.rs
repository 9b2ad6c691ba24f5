//! `mqtt tapir status` - compose TAPIR-POP status reports at the terminal

use std::io::{self, BufRead, Write};

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use tapir_config::TopicKind;
use tapir_mqtt::{MqttEngine, MqttPkgOut, PubSub};
use tapir_protocol::{ComponentStatus, TapirComponentStatus, TapirFunctionStatus};

use super::observations::{Flow, is_eof};
use super::{interrupt, signing_key, status_printer};
use crate::context::Context;
use crate::format::{format_list, format_time};
use crate::table::Table;
use crate::tty::Prompter;

/// Operations offered at the prompt
pub const OPERATIONS: &[&str] = &["add", "del", "show", "send", "list-comp", "quit"];

/// Components a TAPIR-POP reports on
pub const KNOWN_COMPONENTS: &[&str] = &[
    "downstream-notify",
    "main-boot",
    "rpz-update",
    "mqtt-msg",
    "config",
];

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Function id to report as
    #[arg(short = 'F', long = "functionid", default_value = "tapir-cli debug tool")]
    pub function_id: String,
}

/// Status report being edited
#[derive(Debug)]
pub struct StatusComposer {
    report: TapirFunctionStatus,
    component: String,
    status: String,
    headers: bool,
}

impl StatusComposer {
    /// Report for `function_id` with `downstream-notify` failing
    pub fn new(function_id: impl Into<String>) -> Self {
        let mut notify = TapirComponentStatus::new("downstream-notify");
        notify.status = ComponentStatus::Fail;
        notify.error_msg = "Downstream notify is boiling over".to_string();

        let mut report = TapirFunctionStatus {
            function: "tapir-pop".to_string(),
            function_id: function_id.into(),
            ..Default::default()
        };
        report.component_status.insert(notify.component.clone(), notify);

        Self {
            report,
            component: String::new(),
            status: String::new(),
            headers: true,
        }
    }

    pub fn headers(mut self, headers: bool) -> Self {
        self.headers = headers;
        self
    }

    pub fn report(&self) -> &TapirFunctionStatus {
        &self.report
    }

    /// Record `status` for `component`, creating it if needed
    pub fn set(&mut self, component: &str, status: ComponentStatus, message: String, now: DateTime<Utc>) {
        self.report
            .component_status
            .entry(component.to_string())
            .or_insert_with(|| TapirComponentStatus::new(component))
            .record(status, message, now);
    }

    pub fn remove(&mut self, component: &str) -> bool {
        self.report.component_status.remove(component).is_some()
    }

    /// One row per component
    pub fn show(&self) -> Table {
        let mut table = Table::new([
            "Component",
            "Status",
            "ErrorMsg",
            "Msg",
            "NumFailures",
            "LastFailure",
            "LastSuccess",
        ])
        .with_header(self.headers);
        for (name, comp) in &self.report.component_status {
            table.row([
                name.clone(),
                comp.status.to_string(),
                comp.error_msg.clone(),
                comp.msg.clone(),
                comp.num_fails.to_string(),
                format_time(&comp.last_fail),
                format_time(&comp.last_success),
            ]);
        }
        table
    }

    /// Run one operation read from `prompter`
    pub fn step<R, W, F>(&mut self, prompter: &mut Prompter<R, W>, send: &mut F) -> Result<Flow>
    where
        R: BufRead,
        W: Write,
        F: FnMut(&TapirFunctionStatus) -> Result<()>,
    {
        let op = prompter.radio_button("Operation", "add", OPERATIONS)?;
        match op.as_str() {
            "quit" => {
                writeln!(prompter.out(), "QUIT cmd received.")?;
                return Ok(Flow::Quit);
            }
            "add" | "del" => {
                self.component = prompter.question("Component name", &self.component)?;
                if self.component.eq_ignore_ascii_case("QUIT") {
                    return Ok(Flow::Quit);
                }
                let component = self.component.clone();
                if op == "del" {
                    self.remove(&component);
                    return Ok(Flow::Continue);
                }

                let status = self.ask_status(prompter)?;
                let label = match status {
                    ComponentStatus::Fail => "Error message",
                    ComponentStatus::Warn => "Warning message",
                    ComponentStatus::Ok => "Message",
                };
                let message = prompter.question(label, "")?;
                self.set(&component, status, message, Utc::now());
            }
            "show" => writeln!(prompter.out(), "{}", self.show())?,
            "list-comp" => writeln!(prompter.out(), "{}", format_list(KNOWN_COMPONENTS))?,
            "send" => send(&self.report)?,
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn ask_status<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut Prompter<R, W>,
    ) -> io::Result<ComponentStatus> {
        loop {
            self.status = prompter.question("Status", &self.status)?;
            match self.status.parse::<ComponentStatus>() {
                Ok(status) => return Ok(status),
                Err(_) => {
                    writeln!(prompter.out(), "Error: unknown status: {}", self.status)?;
                    self.status = ComponentStatus::Fail.to_string();
                }
            }
        }
    }

    /// Prompt until `quit` or end of input
    pub fn run<R, W, F>(&mut self, prompter: &mut Prompter<R, W>, mut send: F) -> Result<()>
    where
        R: BufRead,
        W: Write,
        F: FnMut(&TapirFunctionStatus) -> Result<()>,
    {
        writeln!(prompter.out(), "Defined operations are: {}", format_list(OPERATIONS))?;
        loop {
            match self.step(prompter, &mut send) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => return Ok(()),
                Err(e) if is_eof(&e) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}

pub async fn run(ctx: &Context, client_id: &str, args: StatusArgs) -> Result<()> {
    let tapir = &ctx.config()?.tapir;
    let topic = tapir.require_topic(TopicKind::Status)?.to_string();
    println!("Using DNS TAPIR status MQTT topic: {topic}");

    let key = signing_key(tapir, TopicKind::Status)?;
    let (status_tx, _status_task) = status_printer();
    let mut engine = MqttEngine::new("status", client_id, &tapir.mqtt, PubSub::PUB, status_tx)?;
    engine.pub_to_topic(&topic, Some(key), true)?;
    let handle = engine.start()?;
    interrupt::spawn(handle.commander.clone());

    let outbox = handle.outbox.clone();
    let (verbose, headers) = (ctx.verbose, ctx.headers);
    tokio::task::spawn_blocking(move || {
        let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
        let mut composer = StatusComposer::new(args.function_id).headers(headers);
        composer.run(&mut prompter, |report| {
            if verbose {
                println!("Sending TAPIR-POP status message to topic {topic}");
            }
            outbox
                .blocking_send(MqttPkgOut::raw(topic.as_str(), report)?)
                .context("MQTT engine is gone")
        })
    })
    .await
    .context("status composer panicked")??;

    let resp = handle.stop().await.context("MQTT engine did not answer")?;
    println!("Response from MQTT Engine: {resp}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Cursor;

    fn drive(composer: &mut StatusComposer, input: &str) -> (Vec<TapirFunctionStatus>, String) {
        let mut p = Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let mut sent = Vec::new();
        composer
            .run(&mut p, |report| {
                sent.push(report.clone());
                Ok(())
            })
            .unwrap();
        (sent, String::from_utf8(p.into_output()).unwrap())
    }

    #[test]
    fn test_initial_report() {
        let c = StatusComposer::new("pop-lab-1");
        let report = c.report();
        assert_eq!(report.function, "tapir-pop");
        assert_eq!(report.function_id, "pop-lab-1");
        let notify = &report.component_status["downstream-notify"];
        assert_eq!(notify.status, ComponentStatus::Fail);
        assert_eq!(notify.error_msg, "Downstream notify is boiling over");
        assert_eq!(notify.num_fails, 0);
    }

    #[test]
    fn test_set_transitions() {
        let mut c = StatusComposer::new("x");
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        c.set("rpz-update", ComponentStatus::Fail, "zone refused".to_string(), t);
        c.set("rpz-update", ComponentStatus::Warn, "slow".to_string(), t);
        let comp = &c.report().component_status["rpz-update"];
        assert_eq!(comp.num_fails, 1);
        assert_eq!(comp.num_warnings, 1);
        assert_eq!(comp.last_fail, t);
        assert_eq!(comp.last_warn, t);
        assert_eq!(comp.error_msg, "slow");

        c.set("rpz-update", ComponentStatus::Ok, "fine".to_string(), t);
        let comp = &c.report().component_status["rpz-update"];
        assert_eq!(comp.status, ComponentStatus::Ok);
        assert_eq!(comp.last_success, t);
        assert!(comp.error_msg.is_empty());
        assert_eq!(comp.msg, "fine");
    }

    #[test]
    fn test_status_retry_and_send() {
        let mut c = StatusComposer::new("pop-lab-1");
        let (sent, out) = drive(
            &mut c,
            "add\nmqtt-msg\nbroken\n\nqueue full\nsend\nquit\n",
        );

        assert!(out.starts_with("Defined operations are: [add del show send list-comp quit]\n"));
        assert!(out.contains("Error: unknown status: broken\n"));
        // re-asked with fail as default
        assert!(out.contains("Status [fail]: "));
        assert!(out.contains("Error message: "));

        assert_eq!(sent.len(), 1);
        let comp = &sent[0].component_status["mqtt-msg"];
        assert_eq!(comp.status, ComponentStatus::Fail);
        assert_eq!(comp.error_msg, "queue full");
        assert_eq!(comp.num_fails, 1);
        assert_eq!(sent[0].component_status.len(), 2);
    }

    #[test]
    fn test_warn_and_ok_prompts() {
        let mut c = StatusComposer::new("x");
        let (_, out) = drive(&mut c, "add\nconfig\nwarn\nreload slow\nadd\n\nok\nreloaded\nquit\n");
        assert!(out.contains("Warning message: "));
        assert!(out.contains("Component name [config]: "));
        assert!(out.contains("Message: "));

        let comp = &c.report().component_status["config"];
        assert_eq!(comp.status, ComponentStatus::Ok);
        assert_eq!(comp.num_warnings, 1);
        assert_eq!(comp.msg, "reloaded");
    }

    #[test]
    fn test_del_and_list_comp() {
        let mut c = StatusComposer::new("x");
        let (sent, out) = drive(&mut c, "del\ndownstream-notify\nlist-comp\nsend\nquit\n");
        assert!(out.contains("[downstream-notify main-boot rpz-update mqtt-msg config]\n"));
        assert!(sent[0].component_status.is_empty());
    }

    #[test]
    fn test_quit_as_component() {
        let mut c = StatusComposer::new("x");
        let (sent, _) = drive(&mut c, "add\nquit\nsend\n");
        assert!(sent.is_empty());
    }

    #[test]
    fn test_show_table() {
        let mut c = StatusComposer::new("x").headers(false);
        c.remove("downstream-notify");
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        c.set("config", ComponentStatus::Ok, "loaded".to_string(), t);
        assert_eq!(
            c.show().to_string(),
            "config  ok    loaded  0  1970-01-01 00:00:00  2024-05-01 12:00:00"
        );
    }
}
