//! 学科 / 学段 / 题型 ID 与名称的映射表

use phf::{phf_map, Map};

/// 学科ID → 名称
pub static SUBJECT_MAP: Map<u32, &'static str> = phf_map! {
    1u32 => "数学",
    2u32 => "物理",
    3u32 => "语文",
    4u32 => "化学",
    5u32 => "英语",
    6u32 => "生物",
    7u32 => "地理",
    8u32 => "自然",
    9u32 => "地球",
    10u32 => "实验",
    11u32 => "道德与法治",
    12u32 => "历史",
    13u32 => "信息技术",
    14u32 => "理化生实验",
    15u32 => "体育与健康",
    16u32 => "素养",
};

/// 学段ID → 名称
pub static STAGE_MAP: Map<u32, &'static str> = phf_map! {
    1u32 => "小学",
    2u32 => "初中",
    3u32 => "高中",
    4u32 => "中职",
};

/// 题型标识 → 名称
pub static TYPE_MAP: Map<&'static str, &'static str> = phf_map! {
    "single_choice" => "单选题",
    "multi_choice" => "多选题",
    "hybrid" => "下拉菜单+填空题",
    "multi_blank" => "填空题",
    "exam" => "主观题",
    "combination" => "组合题",
};

/// 学科ID转名称，未知ID返回空字符串
pub fn subject_name(id: u64) -> &'static str {
    u32::try_from(id)
        .ok()
        .and_then(|id| SUBJECT_MAP.get(&id).copied())
        .unwrap_or("")
}

/// 学段ID转名称，未知ID返回空字符串
pub fn stage_name(id: u64) -> &'static str {
    u32::try_from(id)
        .ok()
        .and_then(|id| STAGE_MAP.get(&id).copied())
        .unwrap_or("")
}

/// 题型标识转名称，未知标识返回空字符串
pub fn type_name(id: &str) -> &'static str {
    TYPE_MAP.get(id).copied().unwrap_or("")
}
