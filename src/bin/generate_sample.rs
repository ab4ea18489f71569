use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n.max(1)
    }

    /// Heavy-tailed count: most repositories are small, a few are huge.
    fn popularity(&mut self, scale: f64) -> u64 {
        let u = self.next_f64().max(1e-9);
        (scale * (1.0 / u - 1.0)).min(250_000.0) as u64
    }
}

const LANGUAGES: [&str; 8] = ["Python", "JavaScript", "Go", "Rust", "Java", "TypeScript", "C++", "Ruby"];
const OWNERS: [&str; 6] = ["octo", "acme", "dataworks", "opensrc", "corelabs", "niño-dev"];
const WORDS: [&str; 10] = ["api", "cli", "engine", "kit", "lens", "parser", "server", "sync", "ui", "viz"];

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let output_path = "github_dataset.csv";
    let epoch = NaiveDate::from_ymd_opt(2015, 1, 1).context("invalid epoch")?;

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record([
        "repositories",
        "stars_count",
        "forks_count",
        "issues_count",
        "pull_requests",
        "contributors",
        "language",
        "created_at",
    ])?;

    let rows = 400;
    for i in 0..rows {
        let owner = OWNERS[rng.below(OWNERS.len() as u64) as usize];
        let word = WORDS[rng.below(WORDS.len() as u64) as usize];
        let language = LANGUAGES[rng.below(LANGUAGES.len() as u64) as usize];

        let stars = rng.popularity(40.0);
        let forks = stars / (2 + rng.below(6)) + rng.below(5);
        let issues = rng.below(stars / 10 + 10);
        let pulls = rng.below(issues + 3);
        let contributors = 1 + rng.popularity(2.0).min(400);
        let created = epoch + Duration::days(rng.below(9 * 365) as i64);

        // Every 50th row lacks a contributor count and is dropped on load.
        let contributors_cell = if i % 50 == 49 { String::new() } else { contributors.to_string() };

        wtr.write_record([
            format!("{owner}/{word}-{i}"),
            stars.to_string(),
            forks.to_string(),
            issues.to_string(),
            pulls.to_string(),
            contributors_cell,
            language.to_string(),
            created.format("%Y-%m-%d").to_string(),
        ])?;
    }

    let text = String::from_utf8(wtr.into_inner().map_err(|e| e.into_error())?)?;
    // The dashboard reads ISO-8859-1; everything in the sample fits in it.
    let latin1: Vec<u8> = text
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();
    std::fs::write(output_path, latin1).with_context(|| format!("writing {output_path}"))?;

    println!("Wrote {rows} repositories to {output_path}");
    Ok(())
}
