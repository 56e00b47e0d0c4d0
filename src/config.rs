/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 最大并发数（同时进行的远程调用链数量上限）
    pub max_workers: usize,
    /// 每次远程调用的最大尝试次数
    pub retry_budget: u32,
    /// 退避基础延迟（毫秒），每次重试翻倍
    pub backoff_base_ms: u64,
    /// 退避延迟上限（毫秒）
    pub backoff_cap_ms: u64,
    /// 问题API地址
    pub problem_api_url: String,
    /// 火山方舟API地址
    pub ark_api_url: String,
    /// 火山方舟API密钥（优先使用 settings.json 中保存的密钥）
    pub ark_api_key: String,
    /// 默认模型ID，可在设置中修改
    pub model_id: String,
    /// 是否启用多模态支持（题目中的图片随提示词一起发送）
    pub enable_multimodal: bool,
    /// 问题ID文件路径
    pub problem_ids_file: String,
    /// 输出目录
    pub output_dir: String,
    /// 输出文件名（导出时自动附加时间戳）
    pub output_filename: String,
    /// 设置文件路径
    pub settings_file: String,
    /// 加密密钥文件路径
    pub key_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: 5,
            retry_budget: 3,
            backoff_base_ms: 2000,
            backoff_cap_ms: 30_000,
            problem_api_url:
                "https://api-test.yangcong345.com/study-course/problem/getDetailProblems"
                    .to_string(),
            ark_api_url: "https://ark.cn-beijing.volces.com/api/v3/chat/completions".to_string(),
            ark_api_key: String::new(),
            model_id: "ep-20250208102341-sjk9f".to_string(),
            enable_multimodal: true,
            problem_ids_file: "problem_ids.json".to_string(),
            output_dir: "output".to_string(),
            output_filename: "problem_solutions.json".to_string(),
            settings_file: "settings.json".to_string(),
            key_file: ".encryption_key".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_workers: std::env::var("MAX_WORKERS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_workers),
            retry_budget: std::env::var("RETRY_BUDGET").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_budget),
            backoff_base_ms: std::env::var("BACKOFF_BASE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backoff_base_ms),
            backoff_cap_ms: std::env::var("BACKOFF_CAP_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backoff_cap_ms),
            problem_api_url: std::env::var("PROBLEM_API_URL").unwrap_or(default.problem_api_url),
            ark_api_url: std::env::var("ARK_API_URL").unwrap_or(default.ark_api_url),
            ark_api_key: std::env::var("ARK_API_KEY").unwrap_or(default.ark_api_key),
            model_id: std::env::var("MODEL_ID").unwrap_or(default.model_id),
            enable_multimodal: std::env::var("ENABLE_MULTIMODAL").ok().and_then(|v| v.parse().ok()).unwrap_or(default.enable_multimodal),
            problem_ids_file: std::env::var("PROBLEM_IDS_FILE").unwrap_or(default.problem_ids_file),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            output_filename: std::env::var("OUTPUT_FILENAME").unwrap_or(default.output_filename),
            settings_file: std::env::var("SETTINGS_FILE").unwrap_or(default.settings_file),
            key_file: std::env::var("KEY_FILE").unwrap_or(default.key_file),
        }
    }
}
