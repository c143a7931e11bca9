use std::{io::BufRead, thread, time::Duration};

use anyhow::{Context, Result};
use cantor_dust::{FlowHandle, Ratio, Settings};
use clap::{Arg, ArgMatches, Command};

const FORM_HELP: &str = "\
Enter `N r i [animate] [manual]`, e.g. `3 1/3 2` or `2 0.3 5 animate`.
`stop` halts the animation, `quit` closes the viewer.";

fn main() -> Result<()> {
    let matches = Command::new("cantor")
        .about("Renders the three-dimensional Cantor dust")
        .arg(
            Arg::new("n")
                .short('n')
                .long("branches")
                .value_name("N")
                .help("Sub-intervals kept per iteration")
                .default_value("2"),
        )
        .arg(
            Arg::new("ratio")
                .short('r')
                .long("ratio")
                .value_name("RATIO")
                .help("Similarity ratio, as a fraction (1/3) or a decimal (0.3)")
                .default_value("1/3"),
        )
        .arg(
            Arg::new("iterations")
                .short('i')
                .long("iterations")
                .value_name("DEPTH")
                .help("Iteration depth")
                .default_value("3"),
        )
        .arg(
            Arg::new("manual")
                .long("manual")
                .help("Present single frames only instead of rendering in real time")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("animate")
                .short('a')
                .long("animate")
                .help("Step through every depth from 0 up to the iteration depth")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("period")
                .long("period")
                .value_name("MILLISECONDS")
                .help("Delay between two animation frames")
                .default_value("1000"),
        )
        .arg(
            Arg::new("max-objects")
                .long("max-objects")
                .value_name("COUNT")
                .help("Object count above which real-time rendering is switched off")
                .default_value("100000"),
        )
        .arg(
            Arg::new("form")
                .long("form")
                .help("Read new parameters from stdin while the viewer runs")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let settings = settings_from(&matches)?;
    if matches.get_flag("form") {
        let template = settings.clone();
        cantor_dust::run_with(settings, move |handle| {
            thread::spawn(move || read_form(handle, template));
        })
    } else {
        cantor_dust::run(settings)
    }
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a String> {
    matches
        .get_one::<String>(name)
        .with_context(|| format!("missing --{name}"))
}

fn settings_from(matches: &ArgMatches) -> Result<Settings> {
    Ok(Settings {
        n: arg(matches, "n")?.parse().context("N must be a whole number")?,
        ratio: arg(matches, "ratio")?.parse::<Ratio>()?,
        iterations: arg(matches, "iterations")?.parse().context("i must be a whole number")?,
        auto_render: !matches.get_flag("manual"),
        animate: matches.get_flag("animate"),
        period: Duration::from_millis(arg(matches, "period")?.parse().context("bad period")?),
        auto_render_max_objcount: arg(matches, "max-objects")?.parse().context("bad object count")?,
        ..Settings::default()
    })
}

/// Parses one line of the form. Options not on the line keep their previous value.
fn parse_form(line: &str, previous: &Settings) -> Result<Settings> {
    let mut fields = line.split_whitespace();
    let mut next = |what: &str| fields.next().with_context(|| format!("missing {what}"));
    let n = next("N")?.parse().context("N must be a whole number")?;
    let ratio = next("r")?.parse::<Ratio>()?;
    let iterations = next("i")?.parse().context("i must be a whole number")?;

    let mut settings = Settings {
        n,
        ratio,
        iterations,
        animate: false,
        ..previous.clone()
    };
    for flag in fields {
        match flag {
            "animate" => settings.animate = true,
            "manual" => settings.auto_render = false,
            "auto" => settings.auto_render = true,
            other => anyhow::bail!("unknown option `{other}`"),
        }
    }
    Ok(settings)
}

fn read_form(handle: FlowHandle, mut settings: Settings) {
    println!("{FORM_HELP}");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("Cannot read the form: {}", e);
                break;
            }
        };
        let sent = match line.trim() {
            "" => continue,
            "stop" => handle.stop_animation(),
            "quit" | "exit" => {
                let _ = handle.exit();
                break;
            }
            line => match parse_form(line, &settings) {
                Ok(parsed) => {
                    settings = parsed;
                    handle.submit(settings.clone())
                }
                Err(e) => {
                    println!("{e:#}\n{FORM_HELP}");
                    continue;
                }
            },
        };
        if sent.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_line_keeps_unmentioned_options() {
        let previous = Settings {
            auto_render: false,
            ..Settings::default()
        };
        let settings = parse_form("3 1/3 2 animate", &previous).unwrap();
        assert_eq!((settings.n, settings.iterations), (3, 2));
        assert_eq!(settings.ratio.to_string(), "1/3");
        assert!(settings.animate);
        assert!(!settings.auto_render);
    }

    #[test]
    fn form_line_rejects_missing_fields() {
        assert!(parse_form("3 1/3", &Settings::default()).is_err());
        assert!(parse_form("3 1/3 2 sideways", &Settings::default()).is_err());
    }
}
