use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use anyhow::{Context as _, Result};
use tracing::{debug, info};

const PROGRAM: &str = "signal-cli";

/// Destination of a report: one Signal group, or a list of recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDelivery {
    user: Option<String>,
    group: Option<String>,
    recipients: Vec<String>,
    program: String,
}

impl SignalDelivery {
    /// `recipients` is a space-separated list of phone numbers.
    pub fn new(user: Option<String>, group: Option<String>, recipients: Option<&str>) -> Self {
        Self {
            user: user.filter(|value| !value.trim().is_empty()),
            group: group.filter(|value| !value.trim().is_empty()),
            recipients: recipients
                .map(|list| list.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            program: PROGRAM.to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Delivery only happens with a sending account and somewhere to send to.
    pub fn is_configured(&self) -> bool {
        self.user.is_some() && (self.group.is_some() || !self.recipients.is_empty())
    }

    /// Drains pending messages, then sends `text` with the charts attached.
    pub fn deliver<P: AsRef<Path>>(&self, text: &str, attachments: &[P]) -> Result<()> {
        let user = self.user.as_deref().context("no Signal user configured")?;
        if !self.is_configured() {
            anyhow::bail!("no Signal group or recipient configured");
        }

        self.run(&receive_args(user))?;
        info!(attachments = attachments.len(), "sending report over Signal");
        self.run(&self.send_args(user, text, attachments))?;
        Ok(())
    }

    fn send_args<P: AsRef<Path>>(
        &self,
        user: &str,
        text: &str,
        attachments: &[P],
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-u".into(), user.into(), "send".into()];
        match &self.group {
            Some(group) => {
                args.push("-g".into());
                args.push(group.into());
            }
            None => args.extend(self.recipients.iter().map(OsString::from)),
        }
        if !text.is_empty() {
            args.push("-m".into());
            args.push(text.into());
        }
        if !attachments.is_empty() {
            args.push("-a".into());
            args.extend(attachments.iter().map(|path| path.as_ref().as_os_str().to_os_string()));
        }
        args
    }

    fn run(&self, args: &[OsString]) -> Result<String> {
        let rendered = render(args);
        debug!(program = %self.program, args = %rendered, "running");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute {} {}", self.program, rendered))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        if output.status.success() {
            Ok(combined)
        } else {
            anyhow::bail!(
                "{} {} exited with {}: {}",
                self.program,
                rendered,
                output.status,
                combined.trim()
            )
        }
    }
}

fn receive_args(user: &str) -> Vec<OsString> {
    vec!["-u".into(), user.into(), "receive".into()]
}

fn render(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
