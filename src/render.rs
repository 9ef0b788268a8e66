use crate::models::{Label, PredictionResult};

pub enum PageView<'a> {
    Form,
    Result {
        prediction: &'a PredictionResult,
        image_url: &'a str,
    },
    Error {
        message: &'a str,
    },
}

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>AI Brain Tumor Detection</title>
<style>
*{box-sizing:border-box;font-family:sans-serif}
body{margin:0;min-height:100vh;display:flex;justify-content:center;align-items:center;background:linear-gradient(120deg,#0f2027,#203a43,#2c5364)}
.glass{width:460px;padding:35px;border-radius:25px;background:rgba(255,255,255,0.15);box-shadow:0 25px 50px rgba(0,0,0,0.4);color:white;text-align:center}
h1{font-size:26px;margin:10px 0 5px}
.subtitle{font-size:14px;opacity:0.85;margin-bottom:25px}
.upload-box{border:2px dashed rgba(255,255,255,0.4);border-radius:18px;padding:25px}
button{margin-top:20px;background:linear-gradient(135deg,#ff512f,#dd2476);border:none;color:white;padding:14px 30px;font-size:16px;border-radius:50px;cursor:pointer}
.card{margin-top:25px;background:rgba(255,255,255,0.12);padding:20px;border-radius:18px}
.result{font-size:26px;font-weight:700}
.tumor{color:#ff4b4b}
.normal{color:#2ecc71}
.error{color:#ffb347}
.progress{height:10px;width:100%;background:rgba(255,255,255,0.3);border-radius:10px;margin-top:8px;overflow:hidden}
.progress-bar{height:100%;background:linear-gradient(to right,#00f260,#0575e6)}
img{margin-top:15px;max-width:100%;border-radius:15px}
</style>
</head>
<body>
<div class="glass">
<h1>AI Brain Tumor Detection</h1>
<div class="subtitle">Deep Learning Powered MRI Analysis</div>
<form method="POST" enctype="multipart/form-data">
<div class="upload-box">
<strong>Upload Brain MRI Image</strong><br>
<input type="file" name="file" accept="image/*" required>
</div>
<button type="submit">Analyze MRI</button>
</form>
"#;

const FOOT: &str = "</div>\n</body>\n</html>\n";

pub fn render_page(view: &PageView<'_>) -> String {
    let mut html = String::with_capacity(HEAD.len() + 512);
    html.push_str(HEAD);

    match view {
        PageView::Form => {}
        PageView::Result {
            prediction,
            image_url,
        } => {
            let class = match prediction.label {
                Label::Tumor => "tumor",
                Label::Normal => "normal",
            };
            html.push_str(&format!(
                concat!(
                    "<div class=\"card\">\n",
                    "<div class=\"result {class}\">{label}</div>\n",
                    "<div class=\"confidence\">Confidence: {confidence:.2}%\n",
                    "<div class=\"progress\"><div class=\"progress-bar\" style=\"width:{confidence:.2}%\"></div></div>\n",
                    "</div>\n",
                    "<img src=\"{src}\" alt=\"Uploaded MRI\">\n",
                    "</div>\n",
                ),
                class = class,
                label = prediction.label,
                confidence = prediction.confidence,
                src = escape_html(image_url),
            ));
        }
        PageView::Error { message } => {
            html.push_str(&format!(
                "<div class=\"card\">\n<div class=\"result error\">Analysis failed</div>\n<p>{}</p>\n</div>\n",
                escape_html(message)
            ));
        }
    }

    html.push_str(FOOT);
    html
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
