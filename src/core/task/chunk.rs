use bytes::Bytes;

/// 分块计划
///
/// 固定块大小，共 ceil(total/chunk) 个块，末块为余数。
/// 切片基于 `Bytes`，不复制负载内容。
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    total_size: u64,
    chunk_size: u64,
    total_chunks: usize,
}

impl ChunkPlan {
    pub fn new(total_size: u64, chunk_size: u64) -> Self {
        assert!(chunk_size > 0, "块大小必须大于0");
        let total_chunks = ((total_size + chunk_size - 1) / chunk_size) as usize;
        Self { total_size, chunk_size, total_chunks }
    }

    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// 第 index 块的字节区间 [start, end)
    pub fn bounds(&self, index: usize) -> (u64, u64) {
        let start = index as u64 * self.chunk_size;
        let end = (start + self.chunk_size).min(self.total_size);
        (start, end)
    }

    /// 第 index 块的数据切片（零拷贝）
    pub fn slice(&self, data: &Bytes, index: usize) -> Bytes {
        let (start, end) = self.bounds(index);
        data.slice(start as usize..end as usize)
    }

    /// 完成 completed 个块后的进度百分比
    pub fn progress_after(&self, completed: usize) -> f32 {
        if self.total_chunks == 0 {
            return 100.0;
        }
        (completed as f32 / self.total_chunks as f32) * 100.0
    }
}
