//! FileStore - key ごとに 1 ファイルの永続ストア
//!
//! # 書き込み
//! 1. 同じディレクトリに書き手ごとの一時ファイルを作り、全体を書く
//! 2. fsync
//! 3. `<key>.json` へ rename（読み手は常に完全な内容を見る）
//!
//! # プロセス間ロック
//! `<key>.lock` に flock（fs2）を取る。`ferry watch` と単発の `ferry enqueue` が
//! 同じディレクトリを使っても、読む → 書くの間に割り込まれない。

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::task;

use crate::domain::StorageError;
use crate::ports::{KeyValueStore, StoreLock};

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }

    fn lock_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", file_stem(key)))
    }
}

/// Keys become file names; anything outside `[A-Za-z0-9._-]` is replaced.
fn file_stem(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn write_replacing(dir: &Path, path: &Path, value: &str) -> Result<(), StorageError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(value.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn lock_file(path: &Path) -> Result<File, StorageError> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;
    file.lock_exclusive()?;
    Ok(file)
}

fn blocking_failed(err: task::JoinError) -> StorageError {
    StorageError::Backend(format!("file store task failed: {err}"))
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let dir = self.dir.clone();
        let path = self.path_for(key);
        let value = value.to_string();
        task::spawn_blocking(move || write_replacing(&dir, &path, &value))
            .await
            .map_err(blocking_failed)?
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Blocks (off the runtime) until the `<key>.lock` flock is free.
    async fn lock(&self, key: &str) -> Result<StoreLock, StorageError> {
        let path = self.lock_path_for(key);
        let file = task::spawn_blocking(move || lock_file(&path))
            .await
            .map_err(blocking_failed)??;
        Ok(StoreLock::holding(file))
    }
}
