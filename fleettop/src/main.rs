//! Entry point for the fleettop TUI. Parses args, resolves the profile and runs the App.

mod app;
mod ui;

use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use app::App;
use fleettop::demo::DemoSource;
use fleettop::environment::EnvironmentContext;
use fleettop::profiles::{load_profiles, save_profiles, ProfileEntry, ProfileRequest, ResolveProfile};
use fleettop::session::Session;
use fleettop::source::{HttpSource, MetricsSource};

const USAGE_FLAGS: &str = "[--profile NAME|-P NAME] [--env NAME|-e NAME] [--interval SECS|-i SECS] [--monitor] [--tls-ca CERT_PEM|-t CERT_PEM] [--save] [--dry-run] [--demo] [http(s)://HOST:PORT]";

#[derive(Debug, Default)]
struct ParsedArgs {
    url: Option<String>,
    tls_ca: Option<String>,
    profile: Option<String>,
    env: Option<String>,
    interval: Option<u64>,
    monitor: bool,
    save: bool,
    dry_run: bool,
    demo: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "fleettop".into());
    let mut parsed = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                return Err(format!("Usage: {prog} {USAGE_FLAGS}"));
            }
            "--tls-ca" | "-t" => {
                parsed.tls_ca = it.next();
            }
            "--profile" | "-P" => {
                parsed.profile = it.next();
            }
            "--env" | "-e" => {
                parsed.env = it.next();
            }
            "--interval" | "-i" => {
                parsed.interval = Some(parse_interval_arg(it.next(), &prog)?);
            }
            "--monitor" => {
                parsed.monitor = true;
            }
            "--save" => {
                parsed.save = true;
            }
            "--dry-run" => {
                parsed.dry_run = true;
            }
            "--demo" => {
                parsed.demo = true;
            }
            _ if arg.starts_with("--tls-ca=") => {
                parsed.tls_ca = flag_value(&arg);
            }
            _ if arg.starts_with("--profile=") => {
                parsed.profile = flag_value(&arg);
            }
            _ if arg.starts_with("--env=") => {
                parsed.env = flag_value(&arg);
            }
            _ if arg.starts_with("--interval=") => {
                parsed.interval = Some(parse_interval_arg(flag_value(&arg), &prog)?);
            }
            _ => {
                if parsed.url.is_none() && !arg.starts_with('-') {
                    parsed.url = Some(arg);
                } else {
                    return Err(format!(
                        "Unexpected argument '{arg}'. Usage: {prog} {USAGE_FLAGS}"
                    ));
                }
            }
        }
    }
    Ok(parsed)
}

fn flag_value(arg: &str) -> Option<String> {
    arg.split_once('=')
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}

fn parse_interval_arg(v: Option<String>, prog: &str) -> Result<u64, String> {
    v.as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| format!("--interval expects a number of seconds. Usage: {prog} {USAGE_FLAGS}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Reuse the same parsing logic for testability
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    match fleettop::logging::init() {
        Ok(path) => tracing::info!(log = %path.display(), "fleettop starting"),
        Err(e) => eprintln!("warning: logging disabled: {e}"),
    }

    // Demo mode short-circuit (ignore other args except conflicting ones)
    if parsed.demo || matches!(parsed.profile.as_deref(), Some("demo")) {
        if parsed.dry_run {
            println!("Resolved: demo");
            return Ok(());
        }
        return run_demo_mode(&parsed).await;
    }

    let profiles_file = load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        tls_ca: parsed.tls_ca.clone(),
        env: parsed.env.clone(),
        interval: parsed.interval,
    };
    let resolved = req.resolve(&profiles_file);

    // Determine final connection parameters (and maybe mutated profiles to persist)
    let mut profiles_mut = profiles_file.clone();
    let entry: ProfileEntry = match resolved {
        ResolveProfile::Direct(entry) => {
            // Possibly save if profile specified and --save or new entry
            if let Some(name) = parsed.profile.as_ref() {
                match profiles_mut.profiles.get(name).cloned() {
                    None => {
                        // New profile: auto-save immediately
                        profiles_mut.profiles.insert(name.clone(), entry.clone());
                        persist(&profiles_mut);
                    }
                    Some(existing) if existing != entry => {
                        let overwrite = parsed.save
                            || prompt_yes_no(&format!("Overwrite existing profile '{name}'? [y/N]: "));
                        if overwrite {
                            profiles_mut.profiles.insert(name.clone(), entry.clone());
                            persist(&profiles_mut);
                        }
                    }
                    Some(_) => {}
                }
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(mut names) => {
            // Always add demo option to list
            if !names.iter().any(|n| n == "demo") {
                names.push("demo".into());
            }
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let Some(name) = line
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|idx| *idx >= 1 && *idx <= names.len())
                .map(|idx| names[idx - 1].clone())
            else {
                return Ok(());
            };
            if name == "demo" {
                return run_demo_mode(&parsed).await;
            }
            match profiles_mut.profiles.get(&name) {
                Some(entry) => entry.clone(),
                None => return Ok(()),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter dashboard URL (http://HOST:PORT or https://...): ")?;
            if url.trim().is_empty() {
                return Ok(());
            }
            let ca = prompt_string("Enter TLS CA path (or leave blank): ")?;
            let entry = ProfileEntry {
                url: url.trim().to_string(),
                tls_ca: Some(ca.trim().to_string()).filter(|c| !c.is_empty()),
                env: parsed.env.clone(),
                interval: parsed.interval,
            };
            profiles_mut.profiles.insert(name, entry.clone());
            persist(&profiles_mut);
            entry
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select.");
            return Ok(());
        }
    };

    if parsed.dry_run {
        println!("Resolved: {}", entry.url);
        return Ok(());
    }

    let source = HttpSource::new(&entry.url, entry.tls_ca.as_deref())?;
    tracing::info!(url = %entry.url, env = entry.env.as_deref().unwrap_or("default"), "connecting");
    run(source, entry.env, entry.interval, parsed.monitor).await
}

async fn run<S: MetricsSource>(
    source: S,
    env: Option<String>,
    interval: Option<u64>,
    monitor: bool,
) -> anyhow::Result<()> {
    let session = Session::new(Arc::new(source), EnvironmentContext::new(env))
        .with_interval_override(interval);
    let mut app = App::new(session, monitor);
    app.run().await
}

fn persist(p: &fleettop::profiles::ProfilesFile) {
    if let Err(e) = save_profiles(p) {
        tracing::warn!(error = %e, "saving profiles failed");
        eprintln!("warning: could not save profiles: {e}");
    }
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

// --- Demo Mode ---

async fn run_demo_mode(parsed: &ParsedArgs) -> anyhow::Result<()> {
    tracing::info!("running against the in-process demo fleet");
    run(DemoSource::new(), parsed.env.clone(), parsed.interval, parsed.monitor).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        std::iter::once("fleettop")
            .chain(v.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn long_short_and_assign_forms() {
        let p = parse_args(args(&["-P", "prod", "--env=jira-prod", "-i", "30", "--monitor"])).unwrap();
        assert_eq!(p.profile.as_deref(), Some("prod"));
        assert_eq!(p.env.as_deref(), Some("jira-prod"));
        assert_eq!(p.interval, Some(30));
        assert!(p.monitor);

        let p = parse_args(args(&["--interval=15", "-e", "stage", "http://mon:9080"])).unwrap();
        assert_eq!(p.interval, Some(15));
        assert_eq!(p.env.as_deref(), Some("stage"));
        assert_eq!(p.url.as_deref(), Some("http://mon:9080"));
    }

    #[test]
    fn rejects_bad_interval_and_extra_positionals() {
        assert!(parse_args(args(&["--interval", "soon"])).is_err());
        assert!(parse_args(args(&["http://a", "http://b"])).is_err());
        assert!(parse_args(args(&["--bogus"])).is_err());
    }

    #[test]
    fn help_is_usage() {
        let err = parse_args(args(&["--help"])).unwrap_err();
        assert!(err.starts_with("Usage: fleettop"));
    }
}
