//! 性能支持模块
//!
//! 解析器缓存与模型构建过程的性能监控

use crate::error::Result;
use crate::parser::{LanguageParser, ParserFactory, SupportedLanguage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// 共享的解析器实例
pub type SharedParser = Arc<Mutex<Box<dyn LanguageParser>>>;

/// 解析器缓存
///
/// 每种语言只创建一个解析器实例，使用时加锁。
/// 锁中毒时沿用内部数据继续工作：解析器与统计信息不存在需要回滚的中间状态。
pub struct ParserCache {
    cache: RwLock<HashMap<SupportedLanguage, SharedParser>>,
    stats: Mutex<CacheStats>,
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 缓存命中次数
    pub hits: u64,
    /// 缓存未命中次数
    pub misses: u64,
    /// 解析器创建次数
    pub creates: u64,
}

impl CacheStats {
    /// 获取缓存命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl Default for ParserCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserCache {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// 获取或创建解析器
    pub fn get_or_create_parser(&self, language: SupportedLanguage) -> Result<SharedParser> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(parser) = cache.get(&language) {
                self.stats.lock().unwrap_or_else(PoisonError::into_inner).hits += 1;
                debug!("Parser cache hit for language: {language}");
                return Ok(Arc::clone(parser));
            }
        }

        debug!("Parser cache miss for language: {language}, creating new parser");
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // 等待写锁期间其他线程可能已经创建
        if let Some(parser) = cache.get(&language) {
            self.stats.lock().unwrap_or_else(PoisonError::into_inner).hits += 1;
            return Ok(Arc::clone(parser));
        }
        let parser: SharedParser = Arc::new(Mutex::new(ParserFactory::create_parser(language)?));
        cache.insert(language, Arc::clone(&parser));

        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.misses += 1;
        stats.creates += 1;
        Ok(parser)
    }

    pub fn get_stats(&self) -> CacheStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!("Parser cache cleared");
    }

    pub fn size(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// 性能监控器
///
/// 可在多个工作线程之间共享
pub struct PerformanceMonitor {
    start_time: Instant,
    counters: Mutex<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    files_processed: u64,
    files_skipped: u64,
    error_count: u64,
    total_processing_time: Duration,
}

/// 性能统计信息
#[derive(Debug, Clone, Default)]
pub struct PerformanceStats {
    /// 总耗时
    pub total_duration: Duration,
    /// 尝试构建的文件数量（不含跳过的文件）
    pub files_processed: u64,
    pub successful_files: u64,
    pub failed_files: u64,
    /// 因语言不受支持而跳过的文件数量
    pub skipped_files: u64,
    /// 平均每个文件的处理时间
    pub avg_file_processing_time: Duration,
    pub cache_stats: CacheStats,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            counters: Mutex::new(Counters::default()),
        }
    }

    fn counters(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 记录文件处理完成
    pub fn record_file_processed(&self, processing_time: Duration) {
        let mut counters = self.counters();
        counters.files_processed += 1;
        counters.total_processing_time += processing_time;
    }

    pub fn record_skipped(&self) {
        self.counters().files_skipped += 1;
    }

    pub fn record_error(&self) {
        self.counters().error_count += 1;
    }

    /// 获取性能统计信息
    pub fn get_stats(&self, cache_stats: CacheStats) -> PerformanceStats {
        let counters = self.counters();
        let avg_file_processing_time = match u32::try_from(counters.files_processed) {
            Ok(count) if count > 0 => counters.total_processing_time / count,
            _ => Duration::ZERO,
        };

        PerformanceStats {
            total_duration: self.start_time.elapsed(),
            files_processed: counters.files_processed,
            successful_files: counters.files_processed.saturating_sub(counters.error_count),
            failed_files: counters.error_count,
            skipped_files: counters.files_skipped,
            avg_file_processing_time,
            cache_stats,
        }
    }
}
