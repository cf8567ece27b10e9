/// 内置的常见子域名字典
const DEFAULT_SUBDOMAINS: &str = include_str!("../lists/default.txt");

/// 获取内置子域名列表，未指定子域名时使用
pub fn get_default_sub_next_data() -> Vec<&'static str> {
    DEFAULT_SUBDOMAINS
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}
