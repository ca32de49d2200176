/// Parse a comma-separated triplet such as `64,64,32`
#[allow(clippy::many_single_char_names)]
pub fn parse_triplet<T: std::str::FromStr>(s: &str) -> Result<(T,T,T), String>
where
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    let v = s.split(',').map(str::trim).collect::<Vec<_>>();
    if v.len() != 3 {
        return Err(format!("expected 3 comma-separated values, found {}", v.len()));
    }
    let parse = |x: &str| x.parse::<T>().map_err(|e| format!("`{x}`: {e}"));
    Ok((parse(v[0])?, parse(v[1])?, parse(v[2])?))
}

/// Group numeric digits to facilitate reading long numbers
pub fn group_digits<F: std::fmt::Display>(n: F) -> String {
    use numsep::{separate, Locale};
    separate(n, Locale::English)
}


/// Wall-clock timing of the stages of a run
pub mod timing {

    use super::group_digits;
    use std::io::{Stdout, Write};
    use std::time::{Duration, Instant};

    /// Reports each stage as `<name> ... <ms> ms` on `out` and keeps the
    /// durations for a final summary. Write failures are ignored: the report
    /// is diagnostic only.
    pub struct Stages<W: Write = Stdout> {
        out: W,
        current: Option<(String, Instant)>,
        finished: Vec<(String, Duration)>,
        created: Instant,
    }

    impl Stages<Stdout> {
        #[allow(clippy::new_without_default)]
        pub fn new() -> Self { Self::to(std::io::stdout()) }
    }

    impl<W: Write> Stages<W> {

        pub fn to(out: W) -> Self {
            Self { out, current: None, finished: vec![], created: Instant::now() }
        }

        /// Announce `name` on the current line and start timing it. A stage
        /// still running is ended first.
        pub fn begin(&mut self, name: &str) {
            if self.current.is_some() { self.end(); }
            let _ = write!(self.out, "{name} ... ");
            let _ = self.out.flush();
            self.current = Some((name.to_string(), Instant::now()));
        }

        /// As `begin`, but leave the line free for a progress bar
        pub fn begin_line(&mut self, name: &str) {
            self.begin(name);
            let _ = writeln!(self.out);
        }

        pub fn end(&mut self) -> Duration {
            let elapsed = self.record();
            let _ = writeln!(self.out, "{} ms", group_digits(elapsed.as_millis()));
            elapsed
        }

        pub fn end_with(&mut self, message: &str) -> Duration {
            let elapsed = self.record();
            let _ = writeln!(self.out, "{message}: {} ms", group_digits(elapsed.as_millis()));
            elapsed
        }

        pub fn finished(&self) -> &[(String, Duration)] { &self.finished }

        pub fn into_inner(self) -> W { self.out }

        /// Time since creation, including gaps between stages
        pub fn total(&self) -> Duration { self.created.elapsed() }

        /// Per-stage durations go to the log, the total to `out`
        pub fn summary(&mut self) {
            for (name, elapsed) in &self.finished {
                log::debug!("{name}: {} ms", group_digits(elapsed.as_millis()));
            }
            let _ = writeln!(self.out, "Total: {} ms", group_digits(self.total().as_millis()));
        }

        fn record(&mut self) -> Duration {
            match self.current.take() {
                Some((name, started)) => {
                    let elapsed = started.elapsed();
                    self.finished.push((name, elapsed));
                    elapsed
                }
                None => Duration::ZERO,
            }
        }
    }
}
