use anyhow::Result;
use regex::Regex;
use url::Url;

/// 校验上传端点是否为合法的 http(s) URL
pub fn is_valid_endpoint(endpoint: &str) -> bool {
    match Url::parse(endpoint) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    if !is_valid_endpoint(endpoint) {
        anyhow::bail!("无效的上传端点: {}", endpoint);
    }
    Ok(())
}

pub fn validate_files(files: &[String]) -> Result<()> {
    if files.is_empty() {
        anyhow::bail!("未提供任何文件。请通过命令行参数或清单文件提供至少一个路径。");
    }
    Ok(())
}

pub fn validate_concurrency(max_concurrent: usize) -> Result<()> {
    if max_concurrent == 0 {
        anyhow::bail!("并发数必须大于0");
    }
    Ok(())
}

/// 清洗展示名：保留字母数字与 . _ -，其余字符替换为下划线
pub fn sanitize_name(name: &str) -> String {
    match Regex::new(r"[^A-Za-z0-9._-]+") {
        Ok(re) => re.replace_all(name, "_").into_owned(),
        Err(_) => name.to_string(),
    }
}
