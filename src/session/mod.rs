use crate::error::Result;

/// 编辑会话：token 输入缓冲 + 配置文档文本缓冲。
/// 文档按行存储，光标为 (行, 列)，列以字符计数，移动时按行长截断。
/// 文档在会话中只是文本，保存前必须能解析回合法 JSON。
pub struct Session {
    token: String,
    lines: Vec<String>,
    cursor_line: usize,
    cursor_col: usize,
    dirty: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            token: String::new(),
            lines: vec![String::new()],
            cursor_line: 0,
            cursor_col: 0,
            dirty: false,
        }
    }

    // ---- token 缓冲 ----

    pub fn token(&self) -> &str {
        &self.token
    }

    /// 去掉首尾空白后的 token，空串视为未填写
    pub fn token_trimmed(&self) -> &str {
        self.token.trim()
    }

    pub fn push_token_char(&mut self, c: char) {
        self.token.push(c);
    }

    pub fn pop_token_char(&mut self) {
        self.token.pop();
    }

    // ---- 文档缓冲 ----

    /// 将 JSON 文档按 2 空格缩进写入缓冲，重置光标与 dirty 标记
    pub fn set_document(&mut self, document: &serde_json::Value) {
        let pretty = serde_json::to_string_pretty(document)
            .unwrap_or_else(|_| document.to_string());
        self.lines = pretty.lines().map(|l| l.to_string()).collect();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.cursor_line = 0;
        self.cursor_col = 0;
        self.dirty = false;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// 将缓冲解析回 JSON。保存前的唯一不变量：必须是合法 JSON
    pub fn parse(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.text())?)
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_line, self.cursor_col)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ---- 编辑原语 ----

    pub fn insert_char(&mut self, c: char) {
        let idx = Self::byte_index(&self.lines[self.cursor_line], self.cursor_col);
        self.lines[self.cursor_line].insert(idx, c);
        self.cursor_col += 1;
        self.dirty = true;
    }

    /// 光标前删除一个字符；在行首则与上一行合并
    pub fn backspace(&mut self) {
        if self.cursor_col > 0 {
            let idx = Self::byte_index(&self.lines[self.cursor_line], self.cursor_col - 1);
            self.lines[self.cursor_line].remove(idx);
            self.cursor_col -= 1;
            self.dirty = true;
        } else if self.cursor_line > 0 {
            let tail = self.lines.remove(self.cursor_line);
            self.cursor_line -= 1;
            self.cursor_col = Self::char_len(&self.lines[self.cursor_line]);
            self.lines[self.cursor_line].push_str(&tail);
            self.dirty = true;
        }
    }

    /// 在光标处断行
    pub fn insert_newline(&mut self) {
        let idx = Self::byte_index(&self.lines[self.cursor_line], self.cursor_col);
        let tail = self.lines[self.cursor_line].split_off(idx);
        self.lines.insert(self.cursor_line + 1, tail);
        self.cursor_line += 1;
        self.cursor_col = 0;
        self.dirty = true;
    }

    pub fn move_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        } else if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = Self::char_len(&self.lines[self.cursor_line]);
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor_col < Self::char_len(&self.lines[self.cursor_line]) {
            self.cursor_col += 1;
        } else if self.cursor_line < self.lines.len() - 1 {
            self.cursor_line += 1;
            self.cursor_col = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.clamp_col();
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor_line < self.lines.len() - 1 {
            self.cursor_line += 1;
            self.clamp_col();
        }
    }

    /// 换行后列可能越界，截断到行尾
    fn clamp_col(&mut self) {
        let len = Self::char_len(&self.lines[self.cursor_line]);
        if self.cursor_col > len {
            self.cursor_col = len;
        }
    }

    /// 字符列号转字节偏移（行内可能有非 ASCII 字符）
    fn byte_index(line: &str, col: usize) -> usize {
        line.char_indices()
            .nth(col)
            .map(|(i, _)| i)
            .unwrap_or(line.len())
    }

    fn char_len(line: &str) -> usize {
        line.chars().count()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
