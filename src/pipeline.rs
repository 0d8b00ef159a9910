use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest, Sha256, Sha512};

use crate::error::{Error, Result};
use crate::filter::FilterConfig;
use crate::parser::UpdateStream;
use crate::render::Renderer;

/// Supported digest algorithms for checksum computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// SHA-256 checksum
    Sha256,
    /// SHA-512 checksum
    Sha512,
}

impl DigestAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(format!(
                "unknown digest algorithm '{s}'. Supported: sha256, sha512"
            )),
        }
    }
}

/// Running hash over the rendered output
enum Checksum {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Checksum {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => Checksum::Sha256(Sha256::new()),
            DigestAlgorithm::Sha512 => Checksum::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Checksum::Sha256(hasher) => hasher.update(bytes),
            Checksum::Sha512(hasher) => hasher.update(bytes),
        }
    }

    fn finish_hex(self) -> String {
        match self {
            Checksum::Sha256(hasher) => hex::encode(hasher.finalize()),
            Checksum::Sha512(hasher) => hex::encode(hasher.finalize()),
        }
    }
}

/// Sink adapter that hashes every byte the wrapped sink accepts
///
/// Pass `&mut sink` to keep using the sink afterwards.
pub struct DigestWriter<W> {
    sink: W,
    checksum: Checksum,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(sink: W, algorithm: DigestAlgorithm) -> Self {
        DigestWriter {
            sink,
            checksum: Checksum::new(algorithm),
        }
    }

    /// Return the wrapped sink and the hex checksum of what it accepted
    pub fn into_parts(self) -> (W, String) {
        (self.sink, self.checksum.finish_hex())
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let accepted = self.sink.write(buf)?;
        self.checksum.update(&buf[..accepted]);
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// `<update>` elements decoded
    pub scanned: usize,
    /// Updates that passed the filter and were rendered
    pub rendered: usize,
    /// Hex checksum of the rendered output, when requested
    pub digest: Option<String>,
}

/// Open an updateinfo file (or stdin for `-`) and stream it through the filter
pub fn run<W: Write>(
    input: &Path,
    config: &FilterConfig,
    renderer: &Renderer,
    output: &mut W,
    digest_algorithm: Option<DigestAlgorithm>,
) -> Result<FilterStats> {
    if input == Path::new("-") {
        let stdin = io::stdin();
        return filter_updates_streaming(stdin.lock(), output, config, renderer, digest_algorithm);
    }

    let file = File::open(input).map_err(|source| Error::InputUnavailable {
        path: input.to_path_buf(),
        source,
    })?;
    filter_updates_streaming(
        BufReader::new(file),
        output,
        config,
        renderer,
        digest_algorithm,
    )
}

/// Stream an updateinfo document, rendering every update the filter keeps
///
/// This function:
/// - Tokenizes the input forward-only, never building a document tree
/// - Materializes one update at a time and drops it after the decision
/// - Writes accepted updates to the output in document order
/// - Stops at the first decode or render error; output already written stays
/// - Optionally computes a checksum of the rendered output
pub fn filter_updates_streaming<R: BufRead, W: Write>(
    input: R,
    output: &mut W,
    config: &FilterConfig,
    renderer: &Renderer,
    digest_algorithm: Option<DigestAlgorithm>,
) -> Result<FilterStats> {
    let updates = UpdateStream::new(input);

    match digest_algorithm {
        Some(algorithm) => {
            let mut sink = DigestWriter::new(output, algorithm);
            let mut stats = process_updates(updates, &mut sink, config, renderer)?;
            stats.digest = Some(sink.into_parts().1);
            Ok(stats)
        }
        None => process_updates(updates, output, config, renderer),
    }
}

fn process_updates<R: BufRead, W: Write>(
    updates: UpdateStream<R>,
    output: &mut W,
    config: &FilterConfig,
    renderer: &Renderer,
) -> Result<FilterStats> {
    let mut stats = FilterStats::default();

    for update in updates {
        let update = update?;
        stats.scanned += 1;

        if !config.should_keep(&update) {
            tracing::debug!(id = %update.id, kind = %update.kind, "skipping update");
            continue;
        }

        tracing::debug!(id = %update.id, kind = %update.kind, "rendering update");
        renderer.render(&update, output)?;
        stats.rendered += 1;
    }

    output.flush()?;
    tracing::info!(
        scanned = stats.scanned,
        rendered = stats.rendered,
        "finished filtering updates"
    );
    Ok(stats)
}
