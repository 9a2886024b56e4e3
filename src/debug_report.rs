use graphmaster::{ActivationReport, Dimension, GraphmasterError, GraphmasterResult, MatchResult, TreeStats};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

/// The three raw input dimensions as given on the command line.
pub struct Query<'a> {
    pub input: &'a str,
    pub that: &'a str,
    pub topic: &'a str,
}

pub fn print_run(query: &Query, res: &GraphmasterResult<Option<MatchResult<String>>>, budget: usize, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Matching: \"{}\"", query.input.trim()), ansi::CYAN)));
    println!(
        "  {} {}  {} {}",
        palette.dim("that:"),
        palette.paint(or_star(query.that), ansi::BLUE),
        palette.dim("│ topic:"),
        palette.paint(or_star(query.topic), ansi::BLUE)
    );

    println!("\n{}", palette.paint("━━━ Result ━━━", ansi::GRAY));
    match res {
        Ok(Some(found)) => {
            print_match(found, &palette);

            println!("\n{}", palette.paint("━━━ Search ━━━", ansi::GRAY));
            println!(
                "  Steps: {} / {} ({:.1}%)  │  Elapsed: {}",
                palette.paint(found.metrics.steps.to_string(), ansi::GREEN),
                palette.dim(budget.to_string()),
                found.metrics.budget_used(budget) * 100.0,
                palette.paint(format!("{:?}", found.metrics.elapsed), ansi::CYAN),
            );
        }
        Ok(None) => {
            println!("{}", palette.dim("  No category matched"));
            println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
            println!("  • No catch-all category ('* | | | ...') was loaded");
            println!("  • A that/topic literal requires words the query does not have");
            println!("\n{}", palette.dim("  Tip: Set RUST_LOG=graphmaster=trace to see learned paths"));
        }
        Err(GraphmasterError::MatchBudgetExceeded { budget, steps }) => {
            println!(
                "  {} after {} steps (budget {})",
                palette.paint("✗ Search aborted", ansi::YELLOW),
                palette.paint(steps.to_string(), ansi::YELLOW),
                palette.dim(budget.to_string())
            );
            println!("\n{}", palette.dim("  Tip: raise --budget or reduce overlapping wildcards"));
        }
        Err(err) => println!("  {}", palette.paint(format!("✗ {err}"), ansi::YELLOW)),
    }
    println!();
}

fn print_match(found: &MatchResult<String>, palette: &ansi::Palette) {
    println!("  {} {}", palette.dim("template:"), palette.bold(palette.paint(&found.template, ansi::GREEN)));
    println!("  {} {}", palette.dim("path:    "), palette.paint(&found.path, ansi::BLUE));

    if found.stars.is_empty() {
        println!("  {}", palette.dim("no stars captured"));
        return;
    }
    for dimension in Dimension::ALL {
        for (idx, star) in found.stars.get(dimension).iter().enumerate() {
            println!(
                "  {} {}",
                palette.paint(format!("{dimension} star {}:", idx + 1), ansi::GRAY),
                palette.paint(star, ansi::YELLOW)
            );
        }
    }
}

pub fn print_tree(stats: &TreeStats, report: &ActivationReport, color: bool) {
    let palette = ansi::Palette::new(color);

    println!("{}", palette.paint("━━━ Tree ━━━", ansi::GRAY));
    println!(
        "  Categories: {}  │  Nodes: {}  │  Height: {}  │  Average size: {}",
        palette.paint(stats.categories.to_string(), ansi::GREEN),
        palette.paint(stats.nodes.to_string(), ansi::CYAN),
        palette.paint(stats.height.to_string(), ansi::BLUE),
        palette.dim(format!("{:.3}", stats.average_size)),
    );

    println!(
        "\n{} {}",
        palette.paint("━━━ Activations ━━━", ansi::GRAY),
        palette.dim(report.generated_at.format("%Y-%m-%d %H:%M:%S").to_string())
    );
    for (idx, entry) in report.entries.iter().take(10).enumerate() {
        println!(
            "  {} {} {} {} {} {} {}",
            palette.paint(format!("[{}]", idx), ansi::GRAY),
            palette.paint(entry.activations.to_string(), ansi::GREEN),
            palette.dim("│"),
            palette.paint(&entry.pattern, ansi::CYAN),
            palette.dim("│ that:"),
            palette.paint(&entry.that, ansi::BLUE),
            palette.dim(format!("│ topic: {}", entry.topic)),
        );
    }
    if report.entries.len() > 10 {
        println!("  {}", palette.dim(format!("... +{} more", report.entries.len() - 10)));
    }
    println!(
        "  {} {}",
        palette.dim("never activated:"),
        palette.paint(report.unused().count().to_string(), ansi::YELLOW)
    );
    println!();
}

fn or_star(text: &str) -> &str {
    if text.trim().is_empty() { "*" } else { text.trim() }
}
