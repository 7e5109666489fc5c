use crate::error::{Error, Result};
use crate::{CompactId, FeatureId};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Mapping from sparse minimum-perfect-hash feature ids to small sequential
/// replacement ids, so a bounded-array solver can consume the vectors.
/// Injective; each id is assigned in first-encounter order starting at 1.
/// Exactly one compaction pass owns the map at a time.
#[derive(Debug)]
pub struct CompactionMap {
    map: HashMap<FeatureId, CompactId>,
    map_max: CompactId,
}

impl Default for CompactionMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CompactionMap {
    pub fn new() -> Self {
        CompactionMap {
            map: HashMap::new(),
            map_max: 1,
        }
    }

    /// Load a persisted map. An absent file yields a fresh empty map; a file
    /// that exists but does not parse is corrupt state and is never silently
    /// replaced.
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CompactionMap::new()),
            Err(e) => return Err(Error::io(format!("opening {}", path.display()), e)),
        };
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
        let map: HashMap<FeatureId, CompactId> =
            bincode::deserialize(&buf).map_err(|source| Error::CorruptState {
                path: path.to_path_buf(),
                source,
            })?;
        let map_max = map.values().copied().max().map_or(1, |max| max + 1);
        Ok(CompactionMap { map, map_max })
    }

    /// Write the map back to its artifact. The payload is just the injective
    /// feature-id to compact-id mapping; `map_max` is derived on load.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serialize(&self.map).map_err(|source| Error::CorruptState {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file =
            File::create(path).map_err(|e| Error::io(format!("creating {}", path.display()), e))?;
        file.write_all(&bytes)
            .map_err(|e| Error::io(format!("writing {}", path.display()), e))
    }

    /// Resolve the compact id for a feature id, assigning the next sequential
    /// id on first encounter.
    pub fn compact_id(&mut self, feature: FeatureId) -> CompactId {
        if let Some(&small) = self.map.get(&feature) {
            return small;
        }
        let small = self.map_max;
        self.map_max += 1;
        self.map.insert(feature, small);
        small
    }

    pub fn get(&self, feature: FeatureId) -> Option<CompactId> {
        self.map.get(&feature).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Rewrite one sparse line, replacing each feature id with its compact id and
/// re-sorting the pairs ascending. The leading document id field passes
/// through untouched. A pair without a `:` delimiter, or with a non-numeric
/// feature id, makes the whole line malformed.
pub fn compact_line(line: &str, map: &mut CompactionMap) -> Result<String> {
    let mut fields = line.split_whitespace();
    let doc_field = fields.next().ok_or_else(|| Error::MalformedRecord {
        pair: line.to_string(),
    })?;

    let mut pairs: BTreeMap<CompactId, &str> = BTreeMap::new();
    for pair in fields {
        let (feature, count) = pair.split_once(':').ok_or_else(|| Error::MalformedRecord {
            pair: pair.to_string(),
        })?;
        let feature: FeatureId = feature.parse().map_err(|_| Error::MalformedRecord {
            pair: pair.to_string(),
        })?;
        pairs.insert(map.compact_id(feature), count);
    }

    let mut out = String::from(doc_field);
    for (small, count) in pairs {
        out.push_str(&format!(" {small}:{count}"));
    }
    Ok(out)
}

/// Outcome of one compaction pass: which files were rewritten, which had
/// malformed records (and how many), and which inputs could not be read.
#[derive(Debug, Default)]
pub struct CompactionReport {
    pub files_processed: usize,
    pub malformed: Vec<(PathBuf, usize)>,
    pub failed: Vec<PathBuf>,
}

enum InputKind {
    File,
    Directory,
}

/// Compact every sparse file under `input` into `destination`, reusing file
/// names. A file input is compacted alone; a directory input iterates its
/// immediate entries, descending into subdirectories only when `recursive` is
/// set. The destination directory is created up front; an unreadable input
/// file fails that file only.
pub fn compact_path(
    input: &Path,
    map: &mut CompactionMap,
    destination: &Path,
    recursive: bool,
) -> Result<CompactionReport> {
    let kind = if input.is_dir() {
        InputKind::Directory
    } else if input.is_file() {
        InputKind::File
    } else {
        return Err(Error::AbsentResource {
            path: input.to_path_buf(),
        });
    };

    ensure_dir(destination)?;

    let mut report = CompactionReport::default();
    match kind {
        InputKind::File => {
            let dest = destination.join(file_name(input));
            compact_file(input, map, &dest, &mut report)?;
        }
        InputKind::Directory => {
            compact_dir(input, map, destination, recursive, &mut report)?;
        }
    }
    Ok(report)
}

fn compact_dir(
    dir: &Path,
    map: &mut CompactionMap,
    destination: &Path,
    recursive: bool,
    report: &mut CompactionReport,
) -> Result<()> {
    let entries =
        fs::read_dir(dir).map_err(|e| Error::io(format!("listing {}", dir.display()), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(format!("listing {}", dir.display()), e))?;
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                let sub_dest = destination.join(file_name(&path));
                ensure_dir(&sub_dest)?;
                compact_dir(&path, map, &sub_dest, recursive, report)?;
            }
            continue;
        }
        let dest = destination.join(file_name(&path));
        match compact_file(&path, map, &dest, report) {
            Ok(()) => {}
            Err(err @ (Error::AbsentResource { .. } | Error::IoFailure { .. })) => {
                // One unreadable file fails that unit only; siblings continue.
                tracing::warn!(file = %path.display(), %err, "skipping sparse file");
                report.failed.push(path);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn compact_file(
    source: &Path,
    map: &mut CompactionMap,
    dest: &Path,
    report: &mut CompactionReport,
) -> Result<()> {
    let file = match File::open(source) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::AbsentResource {
                path: source.to_path_buf(),
            })
        }
        Err(e) => return Err(Error::io(format!("opening {}", source.display()), e)),
    };
    let reader = BufReader::new(file);
    let mut writer = BufWriter::new(
        File::create(dest).map_err(|e| Error::io(format!("creating {}", dest.display()), e))?,
    );

    let mut malformed = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(format!("reading {}", source.display()), e))?;
        if line.trim().is_empty() {
            continue;
        }
        match compact_line(&line, map) {
            Ok(new_line) => {
                writeln!(writer, "{new_line}")
                    .map_err(|e| Error::io(format!("writing {}", dest.display()), e))?;
            }
            Err(Error::MalformedRecord { pair }) => {
                malformed += 1;
                tracing::warn!(
                    file = %source.display(),
                    line = line_no + 1,
                    pair = %pair,
                    "malformed record, line skipped"
                );
            }
            Err(err) => return Err(err),
        }
    }
    writer
        .flush()
        .map_err(|e| Error::io(format!("flushing {}", dest.display()), e))?;

    report.files_processed += 1;
    if malformed > 0 {
        report.malformed.push((source.to_path_buf(), malformed));
    }
    Ok(())
}

/// One explicit create step before any write. `create_dir_all` succeeds when
/// the directory already exists; any other failure is an I/O failure.
fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(format!("creating {}", dir.display()), e))
}

fn file_name(path: &Path) -> std::ffi::OsString {
    path.file_name().map(|n| n.to_os_string()).unwrap_or_default()
}
