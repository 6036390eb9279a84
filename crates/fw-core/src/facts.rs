use crate::value::ParsedValue;
use std::fmt;
use std::process::Stdio;
use std::str::FromStr;
use tokio::process::Command;

/// Fixed internal procedures for `SystemInfo` blocks. Missing tools are
/// reported inline (`N/A`, `Not found`, `0`) rather than as failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactSet {
    Host,
    DevVersions,
    Packages,
}

impl FactSet {
    pub fn as_str(self) -> &'static str {
        match self {
            FactSet::Host => "host",
            FactSet::DevVersions => "dev_versions",
            FactSet::Packages => "packages",
        }
    }

    pub fn default_renderer(self) -> &'static str {
        match self {
            FactSet::Host => "raw_text",
            FactSet::DevVersions | FactSet::Packages => "table",
        }
    }

    pub async fn gather(self) -> ParsedValue {
        match self {
            FactSet::Host => host_facts().await,
            FactSet::DevVersions => dev_versions().await,
            FactSet::Packages => package_counts().await,
        }
    }
}

impl fmt::Display for FactSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactSet {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "host" | "system" => Ok(FactSet::Host),
            "dev_versions" | "dev-versions" => Ok(FactSet::DevVersions),
            "packages" | "app_count" => Ok(FactSet::Packages),
            other => Err(format!("unknown fact set: {other}")),
        }
    }
}

async fn program_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

async fn host_facts() -> ParsedValue {
    let hostname = program_output("hostname", &[])
        .await
        .unwrap_or_else(|| "N/A".to_string());
    let os = program_output("lsb_release", &["-ds"])
        .await
        .unwrap_or_else(|| "N/A".to_string());
    let kernel = program_output("uname", &["-r"])
        .await
        .unwrap_or_else(|| "N/A".to_string());
    ParsedValue::Text(format!(
        "Hostname: {hostname}\nOS:       {os}\nKernel:   {kernel}"
    ))
}

async fn dev_versions() -> ParsedValue {
    let version = |raw: Option<String>| {
        raw.map(|v| {
            v.replacen("go version go", "", 1)
                .replacen("Python ", "", 1)
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "Not found".to_string())
    };
    let node = version(program_output("node", &["--version"]).await);
    let python = version(program_output("python3", &["--version"]).await);
    let go = version(program_output("go", &["version"]).await);
    ParsedValue::Grid(vec![
        vec!["Tool".to_string(), "Version".to_string()],
        vec!["Node.js".to_string(), node],
        vec!["Python".to_string(), python],
        vec!["Go".to_string(), go],
    ])
}

async fn package_counts() -> ParsedValue {
    let snap = count_listing("snap list").await;
    let apt = count_listing("apt list --installed 2>/dev/null").await;
    ParsedValue::Grid(vec![
        vec!["Package Manager".to_string(), "Count".to_string()],
        vec!["snap".to_string(), snap.to_string()],
        vec!["apt".to_string(), apt.to_string()],
    ])
}

/// Lines of a listing minus its header line; 0 when the tool is missing.
async fn count_listing(command: &str) -> usize {
    match program_output("sh", &["-c", command]).await {
        Some(out) => header_stripped_count(&out),
        None => 0,
    }
}

fn header_stripped_count(listing: &str) -> usize {
    listing
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count()
        .saturating_sub(1)
}
