use anyhow::anyhow;
use clap::Parser;
use const_format::concatcp;
use rand::{seq::SliceRandom, Rng};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::fs::File;
use std::ops::{AddAssign, Div};
use std::process::{self, Child, Command, Stdio};
use std::thread;
use std::time::{Duration as StdDuration, Instant};
use tempfile::NamedTempFile;

const LOCAL_PORT: u32 = 8374;
const LOCAL_URL: &str = concatcp!("http://127.0.0.1:", LOCAL_PORT);

#[rustfmt::skip]
const ROCKET_ENV: &[(&str, &str)] = &[
    ("ROCKET_PORT", concatcp!(LOCAL_PORT)),
    ("ROCKET_SECRET_KEY", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
    ("ROCKET_JWT_SECRET", "dummy"),
    ("ROCKET_SESSION_TTL", "86400"),
];

const ANSWERS: &[&str] = &["Yes", "No"];

const ITERATIONS_PER_THREAD: usize = 100;

#[derive(Parser)]
struct Args {
    /// Discard local server output.
    #[arg(short, long)]
    quiet: bool,

    /// Write local server output to this file (overrides --quiet).
    #[arg(long)]
    logfile: Option<String>,

    /// Benchmark an already-running server at this URL instead of spawning one.
    #[arg(long)]
    remote: Option<String>,

    /// Number of worker threads. Defaults to the logical CPU count.
    #[arg(long, default_value_t = num_cpus::get())]
    threads: usize,
}

/// Join URL segments with slashes.
macro_rules! url {
    ($($segment:expr),+) => {{
        std::path::PathBuf::from_iter([$($segment),+]).to_str().unwrap()
    }}
}

/// Build the server and point it at a throwaway database file.
fn setup_deps(db_file: &NamedTempFile) -> anyhow::Result<()> {
    // Make sure the release binary is current.
    Command::new("cargo")
        .args(["build", "--release"])
        .status()?
        .success()
        .then_some(())
        .ok_or_else(|| anyhow!("server build exited nonzero"))?;

    // Point the pool at the scratch file.
    let db_path = db_file
        .path()
        .to_str()
        .ok_or_else(|| anyhow!("non-UTF8 tempfile path"))?;
    env::set_var(
        "ROCKET_DATABASES",
        format!(r#"{{survey_db={{url="{db_path}"}}}}"#),
    );

    // Fixed settings for the child server.
    for (var, val) in ROCKET_ENV {
        env::set_var(var, val);
    }

    Ok(())
}

/// Stop the child server: SIGTERM where available, otherwise a hard kill.
fn terminate_child(child: &mut Child) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let pid = nix::unistd::Pid::from_raw(child.id() as i32);
        nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM)?;
    }
    #[cfg(not(unix))]
    {
        child.kill()?;
    }
    Ok(())
}

/// Launch a local server and wait for it to serve the landing page.
fn launch_server(logfile: Stdio) -> anyhow::Result<Child> {
    let mut proc = Command::new("./target/release/survey-backend")
        .stdout(logfile)
        .spawn()?;

    // Poll until the landing page answers.
    let client = Client::new();
    loop {
        let resp = client
            .get(LOCAL_URL)
            .send()
            .and_then(Response::error_for_status);

        if let Ok(resp) = resp {
            let text = resp.text()?;
            if text.contains("data-page=\"home\"") {
                break;
            } else {
                terminate_child(&mut proc)?;
                proc.wait()?;
                return Err(anyhow!("unexpected landing page: {:?}", text));
            }
        }

        // Bail out if the server died instead of coming up.
        if let Some(retcode) = proc.try_wait()? {
            return Err(anyhow!("server exited early with {}", retcode));
        }
    }

    Ok(proc)
}

/// Fetch the active question IDs the participants will answer.
fn fetch_catalogue(url: &str) -> anyhow::Result<Vec<i64>> {
    #[derive(Deserialize)]
    struct Question {
        id: i64,
    }

    let questions: Vec<Question> = Client::new()
        .get(url!(url, "questions"))
        .send()
        .and_then(Response::error_for_status)?
        .json()?;
    if questions.is_empty() {
        return Err(anyhow!("no active questions to answer"));
    }
    Ok(questions.into_iter().map(|question| question.id).collect())
}

/// Register a participant and return the client with its session cookie.
fn register(url: &str, participant: usize) -> anyhow::Result<(Client, StdDuration)> {
    let client = Client::builder().cookie_store(true).build()?;
    let start = Instant::now();

    let mut rng = rand::thread_rng();
    let data = json!({
        "name": format!("loadtest{participant}"),
        "age": rng.gen_range(18..=70),
        "gender": *["F", "M"].choose(&mut rng).unwrap(),
    });
    client
        .post(url!(url, "participants"))
        .json(&data)
        .send()
        .and_then(Response::error_for_status)?;

    Ok((client, start.elapsed()))
}

/// Durations of each part of the survey flow.
#[derive(Debug, Default)]
struct SurveyTimings {
    register: StdDuration,
    submit: StdDuration,
}

impl AddAssign for SurveyTimings {
    fn add_assign(&mut self, rhs: Self) {
        self.register += rhs.register;
        self.submit += rhs.submit;
    }
}

impl Div<u32> for SurveyTimings {
    type Output = Self;

    fn div(self, rhs: u32) -> Self {
        Self {
            register: self.register / rhs,
            submit: self.submit / rhs,
        }
    }
}

/// Answer every question with a random option. The `client` must hold a
/// session cookie.
fn submit_answers(url: &str, client: &Client, questions: &[i64]) -> anyhow::Result<StdDuration> {
    let quizzes: Vec<_> = questions
        .iter()
        .map(|id| {
            json!({
                "question_id": id,
                "chosen_answer": ANSWERS.choose(&mut rand::thread_rng()),
            })
        })
        .collect();

    let start = Instant::now();
    client
        .post(url!(url, "submit"))
        .json(&json!({ "quizzes": quizzes }))
        .send()
        .and_then(Response::error_for_status)?;
    Ok(start.elapsed())
}

/// Drive registrations and submissions from `num_threads` parallel workers.
fn benchmark(url: &str, questions: &[i64], num_threads: usize) -> anyhow::Result<()> {
    let end_val: usize = num_threads * ITERATIONS_PER_THREAD;

    let start = Instant::now();
    thread::scope(|s| {
        let mut threads = Vec::with_capacity(num_threads);

        for thread_start in (0..end_val).step_by(ITERATIONS_PER_THREAD) {
            let t = s.spawn(move || {
                let mut timings = SurveyTimings::default();

                for participant in thread_start..(thread_start + ITERATIONS_PER_THREAD) {
                    let (client, register_dur) = register(url, participant)?;
                    let submit_dur = submit_answers(url, &client, questions)?;

                    timings += SurveyTimings {
                        register: register_dur,
                        submit: submit_dur,
                    };
                }

                Ok::<_, anyhow::Error>(timings / ITERATIONS_PER_THREAD as u32)
            });
            threads.push(t);
        }

        let mut timings = SurveyTimings::default();
        for t in threads {
            timings += t.join().expect("thread panicked")?;
        }
        let total_duration = start.elapsed();

        let avg_timings = timings / num_threads as u32;
        let avg_total_duration = avg_timings.register + avg_timings.submit;

        // Throughput if every thread sustained its average latency.
        let per_sec = num_threads as f64 / avg_total_duration.as_secs_f64();
        // Measured throughput over the whole wall-clock run.
        let actual_per_sec = end_val as f64 / total_duration.as_secs_f64();

        println!("register: {:?}", avg_timings.register);
        println!("submit:   {:?}", avg_timings.submit);

        println!("\ntotal: {:?} ({:.2}/s)", avg_total_duration, per_sec);
        println!(
            "actual duration: {} submissions in {:?} ({:.2}/s)",
            end_val, total_duration, actual_per_sec
        );

        Ok(())
    })
}

/// Sanity-check that the run is visible in the results report.
fn check_results(url: &str, expected: usize) -> anyhow::Result<()> {
    let report = Client::new()
        .get(url!(url, "results"))
        .send()
        .and_then(Response::error_for_status)?
        .bytes()?;

    #[derive(Deserialize)]
    struct Report {
        participants: u64,
    }
    let report: Report = serde_json::from_slice(&report)?;
    if (report.participants as usize) < expected {
        return Err(anyhow!(
            "results report covers {} participants, expected at least {}",
            report.participants,
            expected
        ));
    }
    println!("results report covers {} participants", report.participants);

    Ok(())
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let url = args.remote.as_deref().unwrap_or(LOCAL_URL);

    // Spawn a local server unless pointed at a remote one.
    let mut db_file: Option<NamedTempFile> = None;
    let mut proc: Option<Child> = None;
    if args.remote.is_none() {
        let file = NamedTempFile::new()?;
        setup_deps(&file)?;
        db_file = Some(file);
        let logfile = match args.logfile {
            Some(path) => Stdio::from(File::create(path)?),
            None => {
                if args.quiet {
                    Stdio::null()
                } else {
                    Stdio::inherit()
                }
            }
        };
        proc = Some(launch_server(logfile)?);
    }

    // Run the workload in a closure so the teardown below always happens.
    let result = (|| {
        let questions = fetch_catalogue(url)?;
        benchmark(url, &questions, args.threads)?;
        check_results(url, args.threads * ITERATIONS_PER_THREAD)
    })();

    // Tear down the server and scratch database.
    if let Some(p) = proc.as_mut() {
        terminate_child(p)?;
        p.wait()?;
    }
    drop(db_file);

    result
}

fn main() {
    if let Err(e) = run() {
        eprintln!("benchmark failed: {e:#}");
        process::exit(1);
    }
}
