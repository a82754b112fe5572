use phf::phf_map;

/// Bloom 认知分类
///
/// 变体的声明顺序即规范顺序，`Ord` 依赖这一点
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BloomCategory {
    /// 记忆
    Remembering,
    /// 理解
    Understanding,
    /// 应用
    Applying,
    /// 分析
    Analyzing,
    /// 评价
    Evaluating,
    /// 创造
    Creating,
}

/// 小写标签 -> 分类（含同义词和动词形式）
static CATEGORY_ALIASES: phf::Map<&'static str, BloomCategory> = phf_map! {
    "remembering" => BloomCategory::Remembering,
    "remember" => BloomCategory::Remembering,
    "understanding" => BloomCategory::Understanding,
    "understand" => BloomCategory::Understanding,
    "applying" => BloomCategory::Applying,
    "apply" => BloomCategory::Applying,
    "analyzing" => BloomCategory::Analyzing,
    "analysing" => BloomCategory::Analyzing,
    "analyze" => BloomCategory::Analyzing,
    "analyse" => BloomCategory::Analyzing,
    "evaluating" => BloomCategory::Evaluating,
    "evaluate" => BloomCategory::Evaluating,
    "creating" => BloomCategory::Creating,
    "create" => BloomCategory::Creating,
};

impl BloomCategory {
    /// 规范顺序
    pub const ALL: [BloomCategory; 6] = [
        BloomCategory::Remembering,
        BloomCategory::Understanding,
        BloomCategory::Applying,
        BloomCategory::Analyzing,
        BloomCategory::Evaluating,
        BloomCategory::Creating,
    ];

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            BloomCategory::Remembering => "Remembering",
            BloomCategory::Understanding => "Understanding",
            BloomCategory::Applying => "Applying",
            BloomCategory::Analyzing => "Analyzing",
            BloomCategory::Evaluating => "Evaluating",
            BloomCategory::Creating => "Creating",
        }
    }

    /// 在规范顺序中的位置（0 开始）
    pub fn rank(self) -> usize {
        self as usize
    }

    /// 解析分类标签
    ///
    /// 忽略大小写和首尾空白，`Analysing` 与 `Analyzing` 归为同一类
    pub fn parse(label: &str) -> Option<Self> {
        let key = label.trim().to_lowercase();
        CATEGORY_ALIASES.get(key.as_str()).copied()
    }
}

impl std::fmt::Display for BloomCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
