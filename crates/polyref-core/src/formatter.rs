//! 输出格式化模块
//!
//! 把检测到的重构渲染为纯文本、Markdown 或 HTML 报告

use crate::error::{PolyrefError, Result};
use crate::refactoring::{RefactoringSummary, RefactoringType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    PlainText,
    Markdown,
    Html,
}

impl OutputFormat {
    /// 推荐的文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::PlainText => "txt",
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = PolyrefError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "plain" | "txt" => Ok(OutputFormat::PlainText),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            other => Err(PolyrefError::ConfigError(format!(
                "Unknown output format: {other}"
            ))),
        }
    }
}

/// 输出格式化器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    /// 输出格式
    pub output_format: OutputFormat,
    /// 是否显示重构前后的位置
    pub show_locations: bool,
    /// 是否显示统计信息
    pub show_summary: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::PlainText,
            show_locations: true,
            show_summary: true,
        }
    }
}

/// 报告渲染器
pub struct ReportRenderer {
    config: FormatterConfig,
}

/// 格式化结果
#[derive(Debug, Clone)]
pub struct FormattedOutput {
    /// 格式化后的内容
    pub content: String,
    /// 输出格式
    pub format: OutputFormat,
    /// 元数据
    pub metadata: OutputMetadata,
}

/// 输出元数据
#[derive(Debug, Clone)]
pub struct OutputMetadata {
    pub refactoring_count: usize,
    /// 涉及的文件数
    pub files_count: usize,
    /// 生成时间戳
    pub generated_at: String,
    /// 内容大小（字节）
    pub content_size: usize,
}

/// 报告中的一组重构，例如同一个提交中检测到的重构
#[derive(Debug, Clone, Default)]
pub struct ReportSection {
    /// 分组标题，单组报告可以省略
    pub title: Option<String>,
    pub refactorings: Vec<RefactoringSummary>,
}

impl ReportSection {
    pub fn new(title: Option<String>, refactorings: Vec<RefactoringSummary>) -> Self {
        Self {
            title,
            refactorings,
        }
    }
}

const REPORT_TITLE: &str = "Refactoring Detection Report";

impl ReportRenderer {
    pub fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    /// 使用默认配置创建渲染器
    pub fn with_default_config() -> Self {
        Self::new(FormatterConfig::default())
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// 渲染重构列表
    pub fn render(&self, refactorings: &[RefactoringSummary]) -> FormattedOutput {
        self.render_sections(&[ReportSection::new(None, refactorings.to_vec())])
    }

    /// 渲染分组的重构列表，统计信息覆盖所有分组，空分组不输出
    pub fn render_sections(&self, sections: &[ReportSection]) -> FormattedOutput {
        let all: Vec<&RefactoringSummary> =
            sections.iter().flat_map(|s| &s.refactorings).collect();
        let sections: Vec<&ReportSection> = sections
            .iter()
            .filter(|s| !s.refactorings.is_empty())
            .collect();

        let content = match self.config.output_format {
            OutputFormat::PlainText => self.render_plain_text(&all, &sections),
            OutputFormat::Markdown => self.render_markdown(&all, &sections),
            OutputFormat::Html => self.render_html(&all, &sections),
        };

        let metadata = OutputMetadata {
            refactoring_count: all.len(),
            files_count: involved_files(&all).len(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            content_size: content.len(),
        };

        FormattedOutput {
            content,
            format: self.config.output_format,
            metadata,
        }
    }

    fn render_plain_text(&self, all: &[&RefactoringSummary], sections: &[&ReportSection]) -> String {
        let mut output = String::new();
        output.push_str(REPORT_TITLE);
        output.push_str("\n\n");

        if self.config.show_summary {
            output.push_str("Summary:\n");
            for (name, count) in kind_counts(all) {
                output.push_str(&format!("  {name}: {count}\n"));
            }
            output.push_str(&format!("  Total refactorings: {}\n", all.len()));
            let files = involved_files(all);
            if !files.is_empty() {
                output.push_str("\nFiles involved:\n");
                for file in files {
                    output.push_str(&format!("  - {file}\n"));
                }
            }
            output.push('\n');
        }

        if all.is_empty() {
            output.push_str("No refactorings detected.\n");
            return output;
        }

        output.push_str("Refactorings:\n");
        let mut index = 0;
        for section in sections {
            if let Some(title) = &section.title {
                output.push_str(&format!("\n{title}\n"));
            }
            for refactoring in &section.refactorings {
                index += 1;
                output.push_str(&format!("{index:>3}. {refactoring}\n"));
                if self.config.show_locations {
                    for location in &refactoring.left_side_locations {
                        output.push_str(&format!("       before: {location}\n"));
                    }
                    for location in &refactoring.right_side_locations {
                        output.push_str(&format!("       after:  {location}\n"));
                    }
                }
            }
        }
        output
    }

    fn render_markdown(&self, all: &[&RefactoringSummary], sections: &[&ReportSection]) -> String {
        let mut output = format!("# {REPORT_TITLE}\n\n");

        if self.config.show_summary {
            output.push_str("## Summary\n\n");
            output.push_str("| Refactoring | Count |\n|---|---|\n");
            for (name, count) in kind_counts(all) {
                output.push_str(&format!("| {name} | {count} |\n"));
            }
            output.push_str(&format!("| **Total** | {} |\n\n", all.len()));

            let files = involved_files(all);
            if !files.is_empty() {
                output.push_str("## Files Involved\n\n");
                for file in files {
                    output.push_str(&format!("- `{file}`\n"));
                }
                output.push('\n');
            }
        }

        output.push_str("## Refactorings\n\n");
        if all.is_empty() {
            output.push_str("_No refactorings detected._\n");
            return output;
        }
        for section in sections {
            if let Some(title) = &section.title {
                output.push_str(&format!("### {title}\n\n"));
            }
            for refactoring in &section.refactorings {
                output.push_str(&format!(
                    "- **{}** ({}): {}\n",
                    refactoring.name, refactoring.language, refactoring.description
                ));
                if self.config.show_locations {
                    for location in &refactoring.left_side_locations {
                        output.push_str(&format!("  - before: `{location}`\n"));
                    }
                    for location in &refactoring.right_side_locations {
                        output.push_str(&format!("  - after: `{location}`\n"));
                    }
                }
            }
            if section.title.is_some() {
                output.push('\n');
            }
        }
        output
    }

    fn render_html(&self, all: &[&RefactoringSummary], sections: &[&ReportSection]) -> String {
        let mut output = String::new();

        // HTML文档头部
        output.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        output.push_str("    <meta charset=\"UTF-8\">\n");
        output.push_str(&format!("    <title>{REPORT_TITLE}</title>\n"));
        output.push_str("    <style>\n");
        output.push_str(DEFAULT_CSS);
        output.push_str("    </style>\n");
        output.push_str("</head>\n<body>\n");
        output.push_str("    <div class=\"container\">\n");
        output.push_str(&format!("        <h1>{REPORT_TITLE}</h1>\n"));

        if self.config.show_summary {
            output.push_str("        <div class=\"summary\">\n");
            output.push_str("            <h2>Summary</h2>\n");
            output.push_str("            <table class=\"stats-table\">\n");
            for (name, count) in kind_counts(all) {
                output.push_str(&format!(
                    "                <tr><td>{name}</td><td>{count}</td></tr>\n"
                ));
            }
            output.push_str(&format!(
                "                <tr><td>Total</td><td>{}</td></tr>\n",
                all.len()
            ));
            output.push_str("            </table>\n");

            let files = involved_files(all);
            if !files.is_empty() {
                output.push_str("            <h2>Files Involved</h2>\n            <ul>\n");
                for file in files {
                    output.push_str(&format!(
                        "                <li><code>{}</code></li>\n",
                        html_escape(file)
                    ));
                }
                output.push_str("            </ul>\n");
            }
            output.push_str("        </div>\n");
        }

        output.push_str("        <div class=\"refactorings\">\n");
        output.push_str("            <h2>Refactorings</h2>\n");
        if all.is_empty() {
            output.push_str("            <p>No refactorings detected.</p>\n");
        }
        for section in sections {
            if let Some(title) = &section.title {
                output.push_str(&format!("            <h3>{}</h3>\n", html_escape(title)));
            }
            output.push_str("            <ol>\n");
            for refactoring in &section.refactorings {
                self.render_html_item(&mut output, refactoring);
            }
            output.push_str("            </ol>\n");
        }
        output.push_str("        </div>\n");

        // HTML文档尾部
        output.push_str("    </div>\n");
        output.push_str("</body>\n</html>\n");
        output
    }

    fn render_html_item(&self, output: &mut String, refactoring: &RefactoringSummary) {
        output.push_str(&format!(
            "                <li><span class=\"kind\">{}</span> <span class=\"language\">{}</span> {}",
            html_escape(&refactoring.name),
            html_escape(&refactoring.language),
            html_escape(&refactoring.description)
        ));
        if self.config.show_locations {
            output.push_str("\n                    <ul class=\"locations\">\n");
            for location in &refactoring.left_side_locations {
                output.push_str(&format!(
                    "                        <li>before: <code>{}</code></li>\n",
                    html_escape(&location.to_string())
                ));
            }
            for location in &refactoring.right_side_locations {
                output.push_str(&format!(
                    "                        <li>after: <code>{}</code></li>\n",
                    html_escape(&location.to_string())
                ));
            }
            output.push_str("                    </ul>\n                ");
        }
        output.push_str("</li>\n");
    }
}

impl FormattedOutput {
    /// 保存到文件
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        std::fs::write(path, &self.content)?;
        Ok(())
    }

    /// 获取内容大小（字节）
    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// 各种重构的数量，只列出出现过的种类
fn kind_counts(refactorings: &[&RefactoringSummary]) -> Vec<(&'static str, usize)> {
    RefactoringType::ALL
        .iter()
        .filter_map(|kind| {
            let count = refactorings.iter().filter(|r| r.kind == *kind).count();
            (count > 0).then_some((kind.display_name(), count))
        })
        .collect()
}

fn involved_files<'r>(refactorings: &[&'r RefactoringSummary]) -> BTreeSet<&'r str> {
    refactorings
        .iter()
        .flat_map(|r| r.involved_files.iter().map(String::as_str))
        .collect()
}

/// HTML转义函数
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const DEFAULT_CSS: &str = r#"
        body {
            font-family: -apple-system, 'Segoe UI', Helvetica, Arial, sans-serif;
            line-height: 1.6;
            margin: 0;
            padding: 20px;
            background-color: #f8f9fa;
        }
        .container {
            max-width: 1200px;
            margin: 0 auto;
            background-color: white;
            padding: 30px;
            border-radius: 8px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
        }
        h1, h2 {
            color: #333;
            border-bottom: 2px solid #e9ecef;
            padding-bottom: 10px;
        }
        .stats-table {
            border-collapse: collapse;
            width: 100%;
            margin: 10px 0;
        }
        .stats-table td {
            border: 1px solid #dee2e6;
            padding: 8px 12px;
        }
        .stats-table td:first-child {
            font-weight: bold;
            background-color: #f8f9fa;
        }
        .kind {
            font-weight: bold;
            color: #0d6efd;
        }
        .language {
            color: #6c757d;
        }
        .locations {
            list-style-type: none;
            font-size: 0.9em;
        }
        code {
            background-color: #f8f9fa;
            padding: 2px 4px;
            border-radius: 3px;
            font-family: 'Consolas', 'Monaco', 'Courier New', monospace;
        }
"#;
