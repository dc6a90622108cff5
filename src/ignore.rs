//! # 镜像忽略规则模块
//!
//! 该模块定义了目录镜像在扫描与刷新时用于排除路径的谓词。
//! 默认策略是忽略最后一段以点号开头的路径（隐藏文件）；
//! 调用方可以在构造时用自定义闭包整体替换该策略，
//! 也可以通过配置文件中的正则表达式在默认策略之上追加规则。
//!
//! 忽略判断在任何文件 I/O 之前执行：被忽略路径的文件系统事件会被直接丢弃。

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::exception::Exception;

/// 相对路径忽略谓词。纯函数、无副作用，初始扫描与每个文件系统事件都会调用。
#[derive(Clone)]
pub struct IgnoreFilter {
    predicate: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl IgnoreFilter {
    /// 默认策略：路径最后一段以点号开头即忽略。
    pub fn dotfiles() -> Self {
        Self {
            predicate: Arc::new(|path: &str| {
                path.rsplit('/').next().map_or(false, |seg| seg.starts_with('.'))
            }),
        }
    }

    /// 用调用方提供的谓词整体替换默认策略。
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// 在默认点号策略之上追加一组正则规则（来自配置文件）。
    ///
    /// 任何一条规则无法编译都会立刻返回 `InvalidIgnorePattern`，
    /// 保证配置错误在启动阶段暴露，而不是等到第一个请求。
    pub fn from_patterns(patterns: &[String]) -> Result<Self, Exception> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let regex = Regex::new(pattern)
                .map_err(|_| Exception::InvalidIgnorePattern(pattern.clone()))?;
            compiled.push(regex);
        }
        let dotfiles = Self::dotfiles();
        Ok(Self {
            predicate: Arc::new(move |path: &str| {
                dotfiles.should_ignore(path) || compiled.iter().any(|re| re.is_match(path))
            }),
        })
    }

    /// 判断给定的相对路径是否应当被镜像排除。
    pub fn should_ignore(&self, relative_path: &str) -> bool {
        (self.predicate)(relative_path)
    }
}

impl Default for IgnoreFilter {
    fn default() -> Self {
        Self::dotfiles()
    }
}

impl fmt::Debug for IgnoreFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IgnoreFilter")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotfiles_ignores_hidden_file() {
        let filter = IgnoreFilter::dotfiles();
        assert!(filter.should_ignore(".env"));
        assert!(filter.should_ignore("conf/.htaccess"));
    }

    #[test]
    fn test_dotfiles_keeps_regular_file() {
        let filter = IgnoreFilter::dotfiles();
        assert!(!filter.should_ignore("index.html"));
        assert!(!filter.should_ignore("assets/logo.png"));
    }

    #[test]
    fn test_dotfiles_only_checks_last_segment() {
        let filter = IgnoreFilter::dotfiles();
        assert!(!filter.should_ignore(".config/readme.txt"));
        assert!(filter.should_ignore(".config/.secret"));
    }

    #[test]
    fn test_custom_replaces_default() {
        let filter = IgnoreFilter::custom(|path| path.ends_with(".tmp"));
        assert!(filter.should_ignore("upload.tmp"));
        // 自定义谓词整体替换默认策略，点号文件不再被排除
        assert!(!filter.should_ignore(".env"));
    }

    #[test]
    fn test_from_patterns_adds_to_dotfiles() {
        let patterns = vec![r"\.bak$".to_string(), r"^private/".to_string()];
        let filter = IgnoreFilter::from_patterns(&patterns).unwrap();
        assert!(filter.should_ignore("page.html.bak"));
        assert!(filter.should_ignore("private/key.pem"));
        assert!(filter.should_ignore(".env"));
        assert!(!filter.should_ignore("index.html"));
    }

    #[test]
    fn test_from_patterns_invalid_regex() {
        let patterns = vec![r"([unclosed".to_string()];
        let result = IgnoreFilter::from_patterns(&patterns);
        assert!(matches!(result, Err(Exception::InvalidIgnorePattern(_))));
    }

    #[test]
    fn test_from_patterns_empty_is_dotfiles_only() {
        let filter = IgnoreFilter::from_patterns(&[]).unwrap();
        assert!(filter.should_ignore(".gitignore"));
        assert!(!filter.should_ignore("style.css"));
    }
}
