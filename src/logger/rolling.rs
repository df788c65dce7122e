//! Dated log file with size/daily rotation, zip compression and age-based retention.
//!
//! Layout under the log directory:
//! ```text
//! logs/
//! ├── app_2026-10-18.jsonl          active file
//! ├── app_2026-10-18.1.jsonl.zip    rolled over on size, compressed
//! └── app_2026-10-17.jsonl.zip      rolled over on date change
//! ```
//!
//! [`RotatingFile`] is driven from the non-blocking writer thread, which is
//! its only owner.

use std::{
    fs::{self, File, Metadata, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use chrono::{Local, NaiveDate};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::error::AppError;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const MB: u64 = 1024 * 1024;

/// When to roll the active file over and what to do with rolled files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Roll over before a write would take the active file past this size.
    pub max_bytes: u64,
    /// Roll over when the local date changes.
    pub daily: bool,
    /// Delete rolled files older than this.
    pub retention: Option<Duration>,
    /// Zip rolled files.
    pub compress: bool,
}

impl RotationPolicy {
    /// 500 MB or daily, kept 30 days, zipped.
    pub const fn production() -> Self {
        Self {
            max_bytes: 500 * MB,
            daily: true,
            retention: Some(Duration::from_secs(30 * DAY.as_secs())),
            compress: true,
        }
    }

    /// 100 MB or daily, kept 7 days, left uncompressed.
    pub const fn development() -> Self {
        Self {
            max_bytes: 100 * MB,
            daily: true,
            retention: Some(Duration::from_secs(7 * DAY.as_secs())),
            compress: false,
        }
    }
}

/// `(device, inode)` of an open file, where the platform exposes it.
type FileId = (u64, u64);

/// Append-only writer for `{dir}/{prefix}_{date}.{extension}`.
///
/// Several writers (threads of other processes included) may share a
/// directory: before each write the active path is checked against the
/// open file, and a writer whose file was rolled away by someone else
/// reopens the new one. Platforms without inode numbers only detect a
/// missing active file.
#[derive(Debug)]
pub struct RotatingFile {
    dir: PathBuf,
    prefix: String,
    extension: String,
    policy: RotationPolicy,
    date: NaiveDate,
    file: File,
    id: Option<FileId>,
    size: u64,
}

impl RotatingFile {
    /// Create the directory if needed, open today's file in append mode and
    /// apply retention to what is already there.
    pub fn open(
        dir: impl Into<PathBuf>,
        prefix: &str,
        extension: &str,
        policy: RotationPolicy,
    ) -> Result<Self, AppError> {
        Self::open_on(dir.into(), prefix, extension, policy, Local::now().date_naive())
    }

    fn open_on(
        dir: PathBuf,
        prefix: &str,
        extension: &str,
        policy: RotationPolicy,
        date: NaiveDate,
    ) -> Result<Self, AppError> {
        fs::create_dir_all(&dir).map_err(|e| AppError::filesystem(&dir, e))?;

        let path = dated_path(&dir, prefix, date, extension);
        let (file, meta) = open_append(&path).map_err(|e| AppError::filesystem(&path, e))?;

        let rotating = Self {
            dir,
            prefix: prefix.to_owned(),
            extension: extension.to_owned(),
            policy,
            date,
            file,
            id: file_id(&meta),
            size: meta.len(),
        };
        rotating
            .sweep()
            .map_err(|e| AppError::filesystem(&rotating.dir, e))?;
        Ok(rotating)
    }

    /// Path of the file currently being written.
    pub fn path(&self) -> PathBuf {
        dated_path(&self.dir, &self.prefix, self.date, &self.extension)
    }

    fn write_on(&mut self, buf: &[u8], today: NaiveDate) -> io::Result<usize> {
        let mut rolled = None;
        if self.policy.daily && today != self.date {
            rolled = Some(self.roll_date(today)?);
        } else {
            self.follow_active()?;
            if self.size > 0 && self.size + buf.len() as u64 > self.policy.max_bytes {
                rolled = Some(self.roll_size()?);
            }
        }

        self.file.write_all(buf)?;
        self.size += buf.len() as u64;

        if let Some(rolled) = rolled {
            self.finish_rolled(&rolled);
        }
        Ok(buf.len())
    }

    /// Reopen the active path if another writer moved our file away, and
    /// pick up the size it has on disk.
    fn follow_active(&mut self) -> io::Result<()> {
        let active = self.path();
        match fs::metadata(&active) {
            Ok(meta) if self.id.is_none() || file_id(&meta) == self.id => {
                self.size = meta.len();
                Ok(())
            }
            Ok(_) => self.reopen(&active),
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.reopen(&active),
            Err(e) => Err(e),
        }
    }

    fn reopen(&mut self, path: &Path) -> io::Result<()> {
        let (file, meta) = open_append(path)?;
        self.file = file;
        self.id = file_id(&meta);
        self.size = meta.len();
        Ok(())
    }

    /// Switch to the file for `today`. Returns the finished file.
    fn roll_date(&mut self, today: NaiveDate) -> io::Result<PathBuf> {
        self.file.flush()?;
        let finished = self.path();

        self.date = today;
        let active = self.path();
        self.reopen(&active)?;
        Ok(finished)
    }

    /// Move the active file aside as `{prefix}_{date}.{n}.{extension}` and
    /// start an empty one. Returns the moved file.
    fn roll_size(&mut self) -> io::Result<PathBuf> {
        self.file.flush()?;
        let active = self.path();
        let rolled = self.next_rolled_path();
        fs::rename(&active, &rolled)?;

        self.reopen(&active)?;
        Ok(rolled)
    }

    /// Compress a rolled file and apply retention. Runs after the record
    /// that triggered the roll-over is written, so failures here only leave
    /// extra files behind. The sink's own writer thread cannot log, so
    /// failures go to stderr.
    fn finish_rolled(&self, rolled: &Path) {
        if self.policy.compress && rolled.exists() {
            if let Err(e) = compress(rolled) {
                eprintln!(
                    "runlog: cannot compress {}, keeping it uncompressed: {e}",
                    rolled.display()
                );
            }
        }
        if let Err(e) = self.sweep() {
            eprintln!("runlog: retention sweep in {} failed: {e}", self.dir.display());
        }
    }

    fn next_rolled_path(&self) -> PathBuf {
        let mut index = 1u32;
        loop {
            let name = format!(
                "{}_{}.{index}.{}",
                self.prefix,
                self.date.format("%Y-%m-%d"),
                self.extension
            );
            let candidate = self.dir.join(&name);
            let zipped = self.dir.join(format!("{name}.zip"));
            if !candidate.exists() && !zipped.exists() {
                return candidate;
            }
            index += 1;
        }
    }

    /// `{prefix}_{date}[.{n}].{extension}[.zip]`: files written by this sink.
    /// Another sink sharing the prefix but not the extension is left alone.
    fn owns(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|rest| rest.split('.').skip(1).any(|part| part == self.extension))
    }

    /// Delete files belonging to this sink that are older than the retention window.
    fn sweep(&self) -> io::Result<()> {
        let Some(retention) = self.policy.retention else {
            return Ok(());
        };
        let active = self.path();
        let now = SystemTime::now();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let owned = entry.file_name().to_str().is_some_and(|name| self.owns(name));
            if !owned || path == active || !entry.file_type()?.is_file() {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            let age = now.duration_since(modified).unwrap_or_default();
            if age > retention {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_on(buf, Local::now().date_naive())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn dated_path(dir: &Path, prefix: &str, date: NaiveDate, extension: &str) -> PathBuf {
    dir.join(format!("{prefix}_{}.{extension}", date.format("%Y-%m-%d")))
}

fn open_append(path: &Path) -> io::Result<(File, Metadata)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let meta = file.metadata()?;
    Ok((file, meta))
}

#[cfg(unix)]
fn file_id(meta: &Metadata) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_id(_meta: &Metadata) -> Option<FileId> {
    None
}

/// Replace `path` with `path.zip` holding a single deflated entry.
fn compress(path: &Path) -> io::Result<PathBuf> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "rolled file has no name"))?;
    let target = path.with_file_name(format!("{name}.zip"));

    if let Err(e) = write_zip(path, name, &target) {
        if target.is_file() {
            let _ = fs::remove_file(&target);
        }
        return Err(e);
    }

    fs::remove_file(path)?;
    Ok(target)
}

fn write_zip(source: &Path, entry: String, target: &Path) -> io::Result<()> {
    let mut source = File::open(source)?;
    let mut archive = ZipWriter::new(File::create(target)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    archive.start_file(entry, options).map_err(io::Error::other)?;
    io::copy(&mut source, &mut archive)?;
    archive.finish().map_err(io::Error::other)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn small(compress: bool) -> RotationPolicy {
        RotationPolicy {
            max_bytes: 32,
            daily: true,
            retention: None,
            compress,
        }
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn policies_match_environment_expectations() {
        let prod = RotationPolicy::production();
        assert_eq!(prod.max_bytes, 500 * MB);
        assert_eq!(prod.retention, Some(Duration::from_secs(30 * 86_400)));
        assert!(prod.compress);

        let dev = RotationPolicy::development();
        assert_eq!(dev.max_bytes, 100 * MB);
        assert_eq!(dev.retention, Some(Duration::from_secs(7 * 86_400)));
        assert!(!dev.compress);
    }

    #[test]
    fn open_creates_directory_and_dated_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("runs").join("logs");
        let file = RotatingFile::open_on(dir.clone(), "app", "log", small(false), day(18)).unwrap();
        assert_eq!(file.path(), dir.join("app_2026-10-18.log"));
        assert!(file.path().is_file());
    }

    #[test]
    fn reopening_appends() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let mut first = RotatingFile::open_on(dir.clone(), "app", "log", small(false), day(18)).unwrap();
        first.write_on(b"one\n", day(18)).unwrap();
        drop(first);

        let mut second = RotatingFile::open_on(dir.clone(), "app", "log", small(false), day(18)).unwrap();
        assert_eq!(second.size, 4);
        second.write_on(b"two\n", day(18)).unwrap();
        assert_eq!(fs::read_to_string(dir.join("app_2026-10-18.log")).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn size_rollover_moves_file_aside() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let mut file = RotatingFile::open_on(dir.clone(), "app", "log", small(false), day(18)).unwrap();

        file.write_on(&[b'a'; 20], day(18)).unwrap();
        file.write_on(&[b'b'; 20], day(18)).unwrap();
        file.write_on(&[b'c'; 20], day(18)).unwrap();

        assert_eq!(
            names(&dir),
            vec!["app_2026-10-18.1.log", "app_2026-10-18.2.log", "app_2026-10-18.log"]
        );
        assert_eq!(fs::read(dir.join("app_2026-10-18.1.log")).unwrap(), vec![b'a'; 20]);
        assert_eq!(fs::read(dir.join("app_2026-10-18.log")).unwrap(), vec![b'c'; 20]);
    }

    #[test]
    fn oversized_record_still_lands_in_one_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let mut file = RotatingFile::open_on(dir.clone(), "app", "log", small(false), day(18)).unwrap();
        file.write_on(&[b'x'; 100], day(18)).unwrap();
        assert_eq!(names(&dir), vec!["app_2026-10-18.log"]);
    }

    #[test]
    fn size_rollover_compresses_when_enabled() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let mut file =
            RotatingFile::open_on(dir.clone(), "app", "jsonl", small(true), day(18)).unwrap();

        file.write_on(b"{\"message\":\"first record\"}\n", day(18)).unwrap();
        file.write_on(b"{\"message\":\"second\"}\n", day(18)).unwrap();

        assert_eq!(
            names(&dir),
            vec!["app_2026-10-18.1.jsonl.zip", "app_2026-10-18.jsonl"]
        );

        let zipped = File::open(dir.join("app_2026-10-18.1.jsonl.zip")).unwrap();
        let mut archive = zip::ZipArchive::new(zipped).unwrap();
        let mut entry = archive.by_name("app_2026-10-18.1.jsonl").unwrap();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "{\"message\":\"first record\"}\n");
    }

    #[test]
    fn date_change_starts_new_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let mut file = RotatingFile::open_on(dir.clone(), "app", "log", small(true), day(17)).unwrap();

        file.write_on(b"yesterday\n", day(17)).unwrap();
        file.write_on(b"today\n", day(18)).unwrap();

        assert_eq!(file.path(), dir.join("app_2026-10-18.log"));
        assert_eq!(names(&dir), vec!["app_2026-10-17.log.zip", "app_2026-10-18.log"]);
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "today\n");
    }

    #[test]
    fn retention_removes_only_aged_files_of_this_sink() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let old = SystemTime::now() - Duration::from_secs(10 * 86_400);

        for name in ["app_2026-10-01.log", "other_2026-10-01.log"] {
            let f = File::create(dir.join(name)).unwrap();
            f.set_modified(old).unwrap();
        }
        File::create(dir.join("app_2026-10-16.log")).unwrap();

        let policy = RotationPolicy {
            retention: Some(Duration::from_secs(7 * 86_400)),
            ..small(false)
        };
        RotatingFile::open_on(dir.clone(), "app", "log", policy, day(18)).unwrap();

        assert_eq!(
            names(&dir),
            vec!["app_2026-10-16.log", "app_2026-10-18.log", "other_2026-10-01.log"]
        );
    }

    #[test]
    fn open_fails_with_filesystem_error_when_dir_is_a_file() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("logs");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = RotatingFile::open_on(blocker.clone(), "app", "log", small(false), day(18)).unwrap_err();
        match err {
            AppError::Filesystem { path, .. } => assert_eq!(path, blocker),
            other => panic!("expected filesystem error, got {other:?}"),
        }
    }

    #[test]
    fn retention_leaves_sinks_with_another_extension_alone() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let old = SystemTime::now() - Duration::from_secs(10 * 86_400);

        for name in [
            "app_2026-10-08.jsonl",
            "app_2026-10-08.1.jsonl.zip",
            "app_2026-10-08.log",
            "app_2026-10-08.1.log.zip",
        ] {
            let f = File::create(dir.join(name)).unwrap();
            f.set_modified(old).unwrap();
        }

        RotatingFile::open_on(dir.clone(), "app", "log", RotationPolicy::development(), day(18))
            .unwrap();

        assert_eq!(
            names(&dir),
            vec!["app_2026-10-08.1.jsonl.zip", "app_2026-10-08.jsonl", "app_2026-10-18.log"]
        );
    }

    #[test]
    fn writer_follows_file_rolled_by_another_writer() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let mut a = RotatingFile::open_on(dir.clone(), "app", "log", small(true), day(18)).unwrap();
        let mut b = RotatingFile::open_on(dir.clone(), "app", "log", small(true), day(18)).unwrap();

        a.write_on(&[b'a'; 20], day(18)).unwrap();
        a.write_on(&[b'b'; 20], day(18)).unwrap();
        b.write_on(b"B-RECORD\n", day(18)).unwrap();

        assert_eq!(names(&dir), vec!["app_2026-10-18.1.log.zip", "app_2026-10-18.log"]);
        let mut expected = vec![b'b'; 20];
        expected.extend_from_slice(b"B-RECORD\n");
        assert_eq!(fs::read(dir.join("app_2026-10-18.log")).unwrap(), expected);
    }

    #[test]
    fn writer_recreates_deleted_active_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let mut file = RotatingFile::open_on(dir.clone(), "app", "log", small(false), day(18)).unwrap();
        file.write_on(b"one\n", day(18)).unwrap();

        fs::remove_file(file.path()).unwrap();
        file.write_on(b"two\n", day(18)).unwrap();

        assert_eq!(fs::read_to_string(file.path()).unwrap(), "two\n");
    }

    #[test]
    fn compression_failure_keeps_record_and_rolled_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        fs::create_dir(dir.join("app_2026-10-17.log.zip")).unwrap();
        let mut file = RotatingFile::open_on(dir.clone(), "app", "log", small(true), day(17)).unwrap();

        file.write_on(b"yesterday\n", day(17)).unwrap();
        assert_eq!(file.write_on(b"today\n", day(18)).unwrap(), 6);

        assert_eq!(fs::read_to_string(file.path()).unwrap(), "today\n");
        assert_eq!(
            fs::read_to_string(dir.join("app_2026-10-17.log")).unwrap(),
            "yesterday\n"
        );
        assert!(dir.join("app_2026-10-17.log.zip").is_dir());
    }
}
