//! 磁盘特征缓存.
//!
//! 每个 tile 对应一个 zlib 压缩的文本文件, 每行 `<值> <名称>`.
//! 认领通过独占创建 `<文件>.lock` 完成; 写入先落到 `<文件>.tmp`, 再原子改名.

use super::{FeatureSource, FeatureVector};
use crate::{Sample, TileId};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 特征缓存错误.
#[derive(Debug, Error)]
pub enum CacheError {
    /// 缓存文件不存在.
    #[error("特征缓存 `{}` 不存在", .0.display())]
    Missing(PathBuf),

    /// 缓存文件内容无法解析.
    #[error("特征缓存 `{}` 第 {line} 行格式错误", .path.display())]
    Malformed {
        /// 缓存文件.
        path: PathBuf,
        /// 出错行号, 从 1 开始.
        line: usize,
    },

    /// 底层 I/O 错误.
    #[error("无法访问特征缓存 `{}`: {source}", .path.display())]
    Io {
        /// 访问的路径.
        path: PathBuf,
        /// 底层错误.
        source: io::Error,
    },
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// 认领结果.
#[derive(Debug)]
pub enum Claim {
    /// 缓存已就绪.
    Ready(PathBuf),
    /// 本进程取得了计算权.
    Owner(CacheWriter),
    /// 其它进程正在计算. 参数为将来的缓存路径.
    Busy(PathBuf),
}

/// 特征缓存目录.
#[derive(Clone, Debug)]
pub struct SigCache {
    root: PathBuf,
}

impl SigCache {
    /// 以 `root` 为缓存目录. 目录不存在时, 首次写入会创建它.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// 缓存目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `source` 的 `tile` 对应的缓存文件路径.
    pub fn path_for(&self, source: &str, tile: TileId) -> PathBuf {
        let stem: String = source
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c => c,
            })
            .collect();
        let TileId { rotation, x, y } = tile;
        self.root.join(format!("{stem}_{rotation}_{x}_{y}.sig.z"))
    }

    /// 尝试认领 `source` 的 `tile`.
    pub fn claim(&self, source: &str, tile: TileId) -> Result<Claim, CacheError> {
        let target = self.path_for(source, tile);
        if target.is_file() {
            return Ok(Claim::Ready(target));
        }
        fs::create_dir_all(&self.root).map_err(io_at(&self.root))?;

        let lock = with_suffix(&target, "lock");
        match OpenOptions::new().write(true).create_new(true).open(&lock) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(Claim::Busy(target)),
            Err(e) => return Err(io_at(&lock)(e)),
        }
        let writer = CacheWriter {
            tmp: with_suffix(&target, "tmp"),
            lock,
            target,
        };
        // 检查与加锁之间, 别的进程可能已经写完.
        if writer.target.is_file() {
            return Ok(Claim::Ready(writer.target.clone()));
        }
        Ok(Claim::Owner(writer))
    }

    /// 读取一个缓存文件.
    pub fn read(path: &Path) -> Result<FeatureVector, CacheError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CacheError::Missing(path.to_path_buf()))
            }
            Err(e) => return Err(io_at(path)(e)),
        };
        let mut fv = FeatureVector::default();
        for (i, line) in BufReader::new(ZlibDecoder::new(file)).lines().enumerate() {
            let line = line.map_err(io_at(path))?;
            if line.trim().is_empty() {
                continue;
            }
            let malformed = || CacheError::Malformed {
                path: path.to_path_buf(),
                line: i + 1,
            };
            let (value, name) = line.split_once(' ').ok_or_else(malformed)?;
            fv.values.push(value.parse().map_err(|_| malformed())?);
            fv.names.push(name.to_string());
        }
        Ok(fv)
    }
}

impl FeatureSource for SigCache {
    fn load(&mut self, sample: &Sample) -> Result<FeatureVector, CacheError> {
        Self::read(&self.path_for(sample.source(), sample.tile()))
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".");
    s.push(suffix);
    PathBuf::from(s)
}

/// 持有某个 tile 计算权的写入器. 析构时释放锁.
#[derive(Debug)]
pub struct CacheWriter {
    lock: PathBuf,
    tmp: PathBuf,
    target: PathBuf,
}

impl CacheWriter {
    /// 写入特征并释放锁, 返回缓存文件路径.
    pub fn commit(self, fv: &FeatureVector) -> Result<PathBuf, CacheError> {
        let file = File::create(&self.tmp).map_err(io_at(&self.tmp))?;
        let mut e = ZlibEncoder::new(io::BufWriter::new(file), Compression::default());
        for (i, v) in fv.values.iter().enumerate() {
            let written = match fv.names.get(i) {
                Some(name) => writeln!(e, "{v} {name}"),
                None => writeln!(e, "{v} feature {i}"),
            };
            written.map_err(io_at(&self.tmp))?;
        }
        e.finish()
            .and_then(|mut w| w.flush())
            .map_err(io_at(&self.tmp))?;
        fs::rename(&self.tmp, &self.target).map_err(io_at(&self.target))?;
        Ok(self.target.clone())
    }
}

impl Drop for CacheWriter {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.tmp);
        let _ = fs::remove_file(&self.lock);
    }
}
