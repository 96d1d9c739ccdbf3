//! 两个平台共用的页面读写脚本
//!
//! 扫描脚本给每个字段打上 `data-aa-field` 标记，返回的句柄就是标记值；
//! 填写脚本按句柄找回元素。页面 → `FormStep` 的翻译都是纯函数，可以直接测试。

use anyhow::Result;
use serde::Deserialize;

use crate::infrastructure::JsExecutor;
use crate::models::{InputShape, Question};
use crate::services::question_resolver::normalize;
use crate::workflow::{FormField, FormStep, PageSignal, StepControl};

const SCAN_SCRIPT: &str = r#"(() => {
  const root = document.querySelector(__ROOT__) || document.body;
  const visible = el => !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
  const clean = s => (s || '').replace(/\s+/g, ' ').trim();
  const labelFor = el => {
    if (el.id) {
      const l = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
      if (l) return clean(l.innerText);
    }
    const wrap = el.closest('label');
    if (wrap) return clean(wrap.innerText);
    return clean(el.getAttribute('aria-label') || el.getAttribute('placeholder') || el.name);
  };
  document.querySelectorAll('[data-aa-field]').forEach(e => e.removeAttribute('data-aa-field'));
  let n = 0;
  const tag = el => { const h = 'aa-' + (n++); el.setAttribute('data-aa-field', h); return h; };
  const fields = [];
  const groups = Array.from(root.querySelectorAll('fieldset, [role="radiogroup"]'))
    .filter(g => g.querySelector('input[type="radio"]') && visible(g));
  for (const g of groups) {
    const legend = g.querySelector('legend, .fb-dash-form-element__label');
    const radios = Array.from(g.querySelectorAll('input[type="radio"]'));
    fields.push({
      handle: tag(g),
      label: clean(legend ? legend.innerText : g.getAttribute('aria-label')),
      kind: 'radio',
      options: radios.map(r => labelFor(r)),
      value: radios.some(r => r.checked) ? 'checked' : ''
    });
  }
  for (const el of root.querySelectorAll('input, textarea, select')) {
    if (!visible(el) || el.disabled) continue;
    const type = (el.getAttribute('type') || el.tagName).toLowerCase();
    if (['radio', 'hidden', 'submit', 'button', 'file', 'checkbox', 'search'].includes(type)) continue;
    if (el.tagName === 'SELECT') {
      const options = Array.from(el.options).map(o => clean(o.text));
      const chosen = el.selectedIndex > 0 ? clean(el.options[el.selectedIndex].text) : '';
      fields.push({ handle: tag(el), label: labelFor(el), kind: 'select', options, value: chosen });
    } else {
      fields.push({
        handle: tag(el),
        label: labelFor(el),
        kind: el.tagName === 'TEXTAREA' ? 'textarea' : type,
        options: [],
        value: el.value || ''
      });
    }
  }
  const buttons = Array.from(root.querySelectorAll('button, [role="button"], input[type="submit"]'))
    .filter(visible)
    .map(b => clean((b.innerText || b.value || '') + ' ' + (b.getAttribute('aria-label') || '')).toLowerCase());
  return {
    fields,
    resume_input: root.querySelector('input[type="file"]') !== null,
    buttons,
    text: clean(document.body ? document.body.innerText : '').toLowerCase().slice(0, 4000),
    url: location.href
  };
})()"#;

const FILL_SCRIPT: &str = r#"(() => {
  const el = document.querySelector('[data-aa-field="' + __HANDLE__ + '"]');
  const value = __VALUE__;
  if (!el) return 'missing';
  const want = value.trim().toLowerCase();
  const fire = (t, name) => t.dispatchEvent(new Event(name, { bubbles: true }));
  if (el.tagName === 'SELECT') {
    const opts = Array.from(el.options);
    const opt = opts.find(o => o.text.trim().toLowerCase() === want)
      || opts.find(o => o.text.trim().toLowerCase().includes(want));
    if (!opt) return 'no_option';
    el.value = opt.value;
    fire(el, 'change');
    return 'ok';
  }
  const radios = Array.from(el.querySelectorAll('input[type="radio"]'));
  if (radios.length > 0) {
    const text = r => {
      const l = r.id ? document.querySelector('label[for="' + CSS.escape(r.id) + '"]') : r.closest('label');
      return ((l && l.innerText) || r.value || '').trim().toLowerCase();
    };
    const radio = radios.find(r => text(r) === want) || radios.find(r => text(r).includes(want));
    if (!radio) return 'no_option';
    radio.click();
    fire(radio, 'change');
    return 'ok';
  }
  const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
  const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
  el.focus();
  setter.call(el, value);
  fire(el, 'input');
  fire(el, 'change');
  el.blur();
  return 'ok';
})()"#;

const SET_VALUE_SCRIPT: &str = r#"(() => {
  const el = document.querySelector(__SELECTOR__);
  if (!el) return false;
  const setter = Object.getOwnPropertyDescriptor(HTMLInputElement.prototype, 'value').set;
  el.focus();
  setter.call(el, __VALUE__);
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return true;
})()"#;

const PAGE_STATE_SCRIPT: &str = r#"(() => ({
  url: location.href,
  text: (document.body ? document.body.innerText : '').replace(/\s+/g, ' ').trim().toLowerCase().slice(0, 4000)
}))()"#;

/// 当前页面的地址和正文（小写）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PageState {
    pub url: String,
    pub text: String,
}

impl PageState {
    pub fn blocked(&self) -> Option<String> {
        detect_block(&self.url, &self.text)
    }
}

/// 扫描脚本返回的单个字段
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawField {
    pub handle: String,
    pub label: String,
    pub kind: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub value: String,
}

/// 扫描脚本的完整结果
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PageScan {
    #[serde(default)]
    pub fields: Vec<RawField>,
    #[serde(default)]
    pub resume_input: bool,
    #[serde(default)]
    pub buttons: Vec<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: String,
}

/// 各平台推进按钮的文字（小写，包含匹配）
#[derive(Debug, Clone, Copy)]
pub struct ControlLabels {
    pub submit: &'static [&'static str],
    pub review: &'static [&'static str],
    pub next: &'static [&'static str],
}

impl ControlLabels {
    /// 提交 > 检查 > 下一步
    pub fn classify(&self, buttons: &[String]) -> Option<StepControl> {
        let has = |labels: &[&str]| buttons.iter().any(|b| labels.iter().any(|l| b.contains(l)));
        if has(self.submit) {
            Some(StepControl::Submit)
        } else if has(self.review) {
            Some(StepControl::Review)
        } else if has(self.next) {
            Some(StepControl::Next)
        } else {
            None
        }
    }

    pub fn labels_for(&self, control: StepControl) -> &'static [&'static str] {
        match control {
            StepControl::Submit => self.submit,
            StepControl::Review => self.review,
            StepControl::Next => self.next,
        }
    }
}

/// 下拉框占位选项
fn is_placeholder(option: &str) -> bool {
    let norm = normalize(option);
    norm.is_empty() || norm.starts_with("select") || norm.starts_with("please select") || norm == "choose"
}

impl RawField {
    /// 翻译为表单字段，没有标签的字段无法作答，直接忽略
    pub fn to_form_field(&self) -> Option<FormField> {
        if self.label.trim().is_empty() {
            return None;
        }

        let options: Vec<String> = self
            .options
            .iter()
            .filter(|o| !is_placeholder(o))
            .cloned()
            .collect();

        let shape = match self.kind.as_str() {
            "number" => InputShape::Numeric,
            "select" | "radio" if is_yes_no(&options) => InputShape::YesNo,
            "select" | "radio" => InputShape::SingleChoice(options),
            _ => InputShape::FreeText,
        };

        let prefilled = !self.value.trim().is_empty() && !is_placeholder(&self.value);

        Some(FormField {
            handle: self.handle.clone(),
            question: Question::new(self.label.trim(), shape),
            prefilled,
        })
    }
}

fn is_yes_no(options: &[String]) -> bool {
    options.len() == 2 && {
        let mut norm: Vec<String> = options.iter().map(|o| normalize(o)).collect();
        norm.sort();
        norm == ["no", "yes"]
    }
}

impl PageScan {
    /// 翻译为状态机可用的表单步骤
    pub fn into_step(self, controls: &ControlLabels, confirmations: &[&str]) -> FormStep {
        let signal = if let Some(reason) = detect_block(&self.url, &self.text) {
            PageSignal::Blocked(reason)
        } else if contains_any(&self.text, confirmations) {
            PageSignal::Confirmation
        } else {
            PageSignal::None
        };

        FormStep {
            fields: self.fields.iter().filter_map(RawField::to_form_field).collect(),
            resume_input: self.resume_input,
            control: controls.classify(&self.buttons),
            signal,
        }
    }
}

/// 检查拦截信号（验证 / 验证码 / 限流）
///
/// 返回简短原因
pub fn detect_block(url: &str, text: &str) -> Option<String> {
    let url = url.to_lowercase();
    let text = text.to_lowercase();
    if url.contains("/checkpoint") || url.contains("/challenge") || url.contains("captcha") {
        return Some("verification".into());
    }
    if contains_any(
        &text,
        &["verify you are human", "security verification", "complete the captcha", "hcaptcha", "are you a robot"],
    ) {
        return Some("captcha".into());
    }
    if contains_any(&text, &["too many requests", "unusual activity", "rate limit"]) {
        return Some("rate_limited".into());
    }
    None
}

pub fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// 扫描 `root_selector` 内的表单
pub async fn scan(exec: &JsExecutor, root_selector: &str) -> Result<PageScan> {
    let js = SCAN_SCRIPT.replace("__ROOT__", &serde_json::to_string(root_selector)?);
    exec.eval_as(js).await
}

/// 填写一个标记过的字段
pub async fn fill(exec: &JsExecutor, handle: &str, value: &str) -> Result<()> {
    let js = FILL_SCRIPT
        .replace("__HANDLE__", &serde_json::to_string(handle)?)
        .replace("__VALUE__", &serde_json::to_string(value)?);
    let outcome: String = exec.eval_as(js).await?;
    match outcome.as_str() {
        "ok" => Ok(()),
        "no_option" => anyhow::bail!("字段 {} 没有选项 '{}'", handle, value),
        _ => anyhow::bail!("字段 {} 已不在页面上", handle),
    }
}

/// 读取当前页面状态
pub async fn page_state(exec: &JsExecutor) -> Result<PageState> {
    exec.eval_as(PAGE_STATE_SCRIPT).await
}

/// 给普通输入框赋值（登录表单等未标记的元素）
pub async fn set_value(exec: &JsExecutor, selector: &str, value: &str) -> Result<bool> {
    let js = SET_VALUE_SCRIPT
        .replace("__SELECTOR__", &serde_json::to_string(selector)?)
        .replace("__VALUE__", &serde_json::to_string(value)?);
    exec.eval_as(js).await
}

/// 点击文字匹配任一标签的按钮
pub async fn click_any(exec: &JsExecutor, scope_selector: &str, labels: &[&str]) -> Result<bool> {
    for label in labels {
        if exec.click_text(scope_selector, label).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELS: ControlLabels = ControlLabels {
        submit: &["submit application"],
        review: &["review"],
        next: &["next", "continue"],
    };

    fn raw(kind: &str, label: &str, options: &[&str], value: &str) -> RawField {
        RawField {
            handle: "aa-0".into(),
            label: label.into(),
            kind: kind.into(),
            options: options.iter().map(|s| s.to_string()).collect(),
            value: value.into(),
        }
    }

    #[test]
    fn test_field_shapes() {
        let yes_no = raw("radio", "Are you legally authorized to work?", &["Yes", "No"], "")
            .to_form_field()
            .unwrap();
        assert_eq!(yes_no.question.shape, InputShape::YesNo);
        assert!(!yes_no.prefilled);

        let select = raw("select", "Degree", &["Select an option", "Bachelor's", "Master's"], "")
            .to_form_field()
            .unwrap();
        assert_eq!(
            select.question.shape,
            InputShape::SingleChoice(vec!["Bachelor's".into(), "Master's".into()])
        );

        let number = raw("number", "Years of Python", &[], "").to_form_field().unwrap();
        assert_eq!(number.question.shape, InputShape::Numeric);

        let text = raw("tel", "Mobile phone number", &[], "+1 555").to_form_field().unwrap();
        assert_eq!(text.question.shape, InputShape::FreeText);
        assert!(text.prefilled);
    }

    #[test]
    fn test_unlabeled_field_is_ignored() {
        assert!(raw("text", "  ", &[], "").to_form_field().is_none());
    }

    #[test]
    fn test_placeholder_selection_is_not_prefilled() {
        let field = raw("select", "Country", &["Select an option", "Canada"], "Select an option")
            .to_form_field()
            .unwrap();
        assert!(!field.prefilled);
    }

    #[test]
    fn test_control_priority() {
        let buttons = vec!["back".to_string(), "review your application".to_string()];
        assert_eq!(LABELS.classify(&buttons), Some(StepControl::Review));

        let buttons = vec!["continue to next step next".to_string()];
        assert_eq!(LABELS.classify(&buttons), Some(StepControl::Next));

        let buttons = vec!["submit application".to_string(), "back".to_string()];
        assert_eq!(LABELS.classify(&buttons), Some(StepControl::Submit));

        assert_eq!(LABELS.classify(&["dismiss".to_string()]), None);
    }

    #[test]
    fn test_detect_block() {
        assert_eq!(
            detect_block("https://www.linkedin.com/checkpoint/challenge/123", ""),
            Some("verification".into())
        );
        assert_eq!(
            detect_block("https://www.indeed.com/jobs", "Please verify you are human"),
            Some("captcha".into())
        );
        assert_eq!(
            detect_block("https://x", "We've noticed unusual activity from your account"),
            Some("rate_limited".into())
        );
        assert_eq!(detect_block("https://www.indeed.com/viewjob?jk=1", "apply now"), None);
    }

    #[test]
    fn test_scan_into_step_signals() {
        let scan = PageScan {
            text: "your application was sent to acme".into(),
            url: "https://www.linkedin.com/jobs/view/1/".into(),
            ..Default::default()
        };
        let step = scan.into_step(&LABELS, &["application was sent"]);
        assert_eq!(step.signal, PageSignal::Confirmation);

        let scan = PageScan {
            url: "https://www.linkedin.com/checkpoint/lg/login".into(),
            buttons: vec!["submit application".into()],
            ..Default::default()
        };
        let step = scan.into_step(&LABELS, &["application was sent"]);
        assert_eq!(step.signal, PageSignal::Blocked("verification".into()));
    }

    #[test]
    fn test_scan_deserializes_script_output() {
        let json = serde_json::json!({
            "fields": [{"handle": "aa-0", "label": "First name", "kind": "text", "options": [], "value": ""}],
            "resume_input": true,
            "buttons": ["next"],
            "text": "contact info",
            "url": "https://www.linkedin.com/jobs/view/1/"
        });
        let scan: PageScan = serde_json::from_value(json).unwrap();
        let step = scan.into_step(&LABELS, &[]);
        assert_eq!(step.fields.len(), 1);
        assert!(step.resume_input);
        assert_eq!(step.control, Some(StepControl::Next));
    }
}
