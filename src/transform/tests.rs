use std::time::Duration;

use tokio::sync::oneshot;

use super::*;
use crate::config::{ConfigOverrides, MIP_IFRAME, MIP_IMG, TagOverride};
use crate::probe::tests::{FakeFetcher, Reply};

fn engine(fetcher: &FakeFetcher) -> Miperize<FakeFetcher, ImageDecoder> {
    Miperize::with_parts(MipConfig::default(), fetcher.clone(), ImageDecoder)
}

const WIX: &str = "http://static.wixstatic.com/media/355241_d31358572a2542c5a44738ddcb59e7ea.jpg_256";
const GIPHY: &str = "https://media.giphy.com/media/l46CtzgjhTm29Cbjq/giphy.gif";
const BROKEN: &str = "http://example.com/images/IMG_xyz.jpg";

// =============================================================================
// Pass-through
// =============================================================================

#[tokio::test]
async fn test_untargeted_markup_is_unchanged() {
    let fetcher = FakeFetcher::new();
    let html = r#"<div class="post"><p>Hello <b>world</b></p><a href="/about">about</a></div>"#;

    let output = engine(&fetcher).transform(html).await.unwrap();
    assert_eq!(output, html);
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_comments_are_kept() {
    let html = "<!-- teaser --><p>text</p>";
    let output = engine(&FakeFetcher::new()).transform(html).await.unwrap();
    assert_eq!(output, html);
}

#[tokio::test]
async fn test_img_without_src_is_unchanged() {
    let output = engine(&FakeFetcher::new())
        .transform("<img><p>some text here</p>")
        .await
        .unwrap();
    assert_eq!(output, "<img><p>some text here</p>");
}

#[tokio::test]
async fn test_iframe_without_src_is_unchanged() {
    let output = engine(&FakeFetcher::new())
        .transform("<iframe></iframe>")
        .await
        .unwrap();
    assert_eq!(output, "<iframe></iframe>");
}

#[tokio::test]
async fn test_deep_nesting() {
    let depth = 1000;
    let html = format!("{}x{}", "<div>".repeat(depth), "</div>".repeat(depth));

    let output = engine(&FakeFetcher::new()).transform(&html).await.unwrap();
    assert_eq!(output, html);
}

// =============================================================================
// Document structure
// =============================================================================

const DOCUMENT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Fish &amp; Chips</title>
<link rel="stylesheet" href="/main.css">
<style>p > a { color: red }</style>
<script>if (a < b && c > d) { document.write("<p>hi</p><img src='http://x.test/y.png'>"); }</script>
</head>
<body class="post">
<!-- header -->
<p>Caf&eacute; &lt;open&gt;&nbsp;line<br>next</p>
<ul><li>a</li><li>b</li></ul>
<table><tbody><tr><td>1</td><td>2</td></tr></tbody></table>
<textarea name="note"><b>not bold</b></textarea>
</body>
</html>
"#;

#[tokio::test]
async fn test_full_document_is_unchanged() {
    let fetcher = FakeFetcher::new();
    let output = engine(&fetcher).transform(DOCUMENT).await.unwrap();

    assert_eq!(output, DOCUMENT);
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_lenient_document_keeps_its_structure() {
    let html = concat!(
        "<!doctype html><HTML><BODY>",
        "<p>one<p>two<br/>three",
        "<ul><li>a<li>b</ul>",
        r#"<IMG SRC="/pic.png">"#,
        "<select><option>x<option>y</select>",
        "<table><tr><td>1<td>2<tr><td>3</table>",
        "</BODY></HTML>",
    );

    let output = engine(&FakeFetcher::new()).transform(html).await.unwrap();

    assert_eq!(
        output,
        concat!(
            "<!doctype html><html><body>",
            "<p>one</p><p>two<br>three</p>",
            "<ul><li>a</li><li>b</li></ul>",
            r#"<mip-img src="/pic.png" width="600" height="400" layout="responsive"></mip-img>"#,
            "<select><option>x</option><option>y</option></select>",
            "<table><tr><td>1</td><td>2</td></tr><tr><td>3</td></tr></table>",
            "</body></html>",
        )
    );
}

#[tokio::test]
async fn test_img_after_self_closing_br_stays_a_sibling() {
    let output = engine(&FakeFetcher::new())
        .transform(r#"<p>line<br/>next</p><img src="/a.png"><br/><hr />"#)
        .await
        .unwrap();

    assert_eq!(
        output,
        r#"<p>line<br>next</p><mip-img src="/a.png" width="600" height="400" layout="responsive"></mip-img><br><hr>"#
    );
}

#[tokio::test]
async fn test_uppercase_img_takes_no_children() {
    let output = engine(&FakeFetcher::new())
        .transform(r#"<IMG SRC="/a.png"><P>x</P>"#)
        .await
        .unwrap();

    assert_eq!(
        output,
        r#"<mip-img src="/a.png" width="600" height="400" layout="responsive"></mip-img><p>x</p>"#
    );
}

#[tokio::test]
async fn test_script_body_is_not_rewritten() {
    let fetcher = FakeFetcher::new();
    let html = r#"<script>if (a < b) { x = "<img src='http://x/y.png'>"; }</script><p>after</p>"#;

    let output = engine(&fetcher).transform(html).await.unwrap();

    assert_eq!(output, html);
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_doctype_is_kept() {
    let html = "<!doctype html><p>x</p>";
    let output = engine(&FakeFetcher::new()).transform(html).await.unwrap();
    assert_eq!(output, html);
}

#[tokio::test]
async fn test_optional_end_tags_are_closed() {
    let engine = engine(&FakeFetcher::new());

    assert_eq!(
        engine.transform("<p>one<p>two").await.unwrap(),
        "<p>one</p><p>two</p>"
    );
    assert_eq!(
        engine.transform("<ul><li>a<li>b</ul><p>after</p>").await.unwrap(),
        "<ul><li>a</li><li>b</li></ul><p>after</p>"
    );
}

#[tokio::test]
async fn test_stray_end_tags_do_not_swallow_siblings() {
    let output = engine(&FakeFetcher::new())
        .transform(r#"<div><span>x</div><img src="/a.png"></p>"#)
        .await
        .unwrap();

    assert_eq!(
        output,
        r#"<div><span>x</span></div><mip-img src="/a.png" width="600" height="400" layout="responsive"></mip-img>"#
    );
}

// =============================================================================
// Images
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_small_remote_img_is_fixed() {
    let url = "http://static.example.com/a.jpg";
    let fetcher = FakeFetcher::new().reply(url, Reply::image(50, 50));

    let output = engine(&fetcher)
        .transform(&format!(r#"<img src="{url}">"#))
        .await
        .unwrap();

    assert_eq!(
        output,
        r#"<mip-img src="https://static.example.com/a.jpg" width="50" height="50" layout="fixed"></mip-img>"#
    );
    assert_eq!(fetcher.requests(), vec![url]);
}

#[tokio::test(start_paused = true)]
async fn test_big_remote_img_is_responsive() {
    let fetcher = FakeFetcher::new().reply(WIX, Reply::image(350, 200));

    let output = engine(&fetcher)
        .transform(&format!(r#"<img src="{WIX}">"#))
        .await
        .unwrap();

    assert!(output.starts_with("<mip-img"));
    assert!(output.contains(r#"layout="responsive""#));
    assert!(output.contains(r#"width="350""#));
    assert!(output.contains(r#"height="200""#));
    assert!(output.ends_with("</mip-img>"));
}

#[tokio::test(start_paused = true)]
async fn test_remote_gif_overrides_partial_dimensions() {
    let fetcher = FakeFetcher::new().reply(GIPHY, Reply::image(800, 600));

    let output = engine(&fetcher)
        .transform(&format!(r#"<img src="{GIPHY}" height="500">"#))
        .await
        .unwrap();

    assert!(output.starts_with("<mip-anim"));
    assert!(output.contains(&format!(r#"src="{GIPHY}""#)));
    assert!(output.contains(r#"layout="responsive""#));
    assert!(output.contains(r#"width="800""#));
    assert!(output.contains(r#"height="600""#));
    assert!(!output.contains(r#"height="500""#));
    assert!(output.ends_with("</mip-anim>"));
}

#[tokio::test]
async fn test_gif_suffix_is_case_sensitive() {
    let output = engine(&FakeFetcher::new())
        .transform(r#"<img src="/a.GIF">"#)
        .await
        .unwrap();
    assert!(output.starts_with("<mip-img"));
}

#[tokio::test]
async fn test_local_img_uses_defaults_without_probe() {
    let fetcher = FakeFetcher::new();

    let output = engine(&fetcher)
        .transform(r#"<img src="/content/images/IMG_xyz.jpg">"#)
        .await
        .unwrap();

    assert_eq!(
        output,
        r#"<mip-img src="/content/images/IMG_xyz.jpg" width="600" height="400" layout="responsive"></mip-img>"#
    );
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_protocol_relative_img_is_local() {
    let fetcher = FakeFetcher::new();

    let output = engine(&fetcher)
        .transform(r#"<img src="//cdn.example.com/a.gif">"#)
        .await
        .unwrap();

    assert_eq!(
        output,
        r#"<mip-anim src="https://cdn.example.com/a.gif" width="600" height="400" layout="responsive"></mip-anim>"#
    );
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_fully_sized_img_skips_probe() {
    let fetcher = FakeFetcher::new();

    let output = engine(&fetcher)
        .transform(r#"<img src="http://example.com/a.jpg" width="120" height="80" layout="fixed">"#)
        .await
        .unwrap();

    assert_eq!(
        output,
        r#"<mip-img src="https://example.com/a.jpg" width="120" height="80" layout="fixed"></mip-img>"#
    );
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_configured_image_defaults() {
    let config = MipConfig::merged(
        ConfigOverrides::new().tag(MIP_IMG, TagOverride::new().width(200).height(100)),
    )
    .unwrap();
    let engine = Miperize::with_parts(config, FakeFetcher::new(), ImageDecoder);

    let output = engine.transform(r#"<img src="a.png">"#).await.unwrap();
    assert_eq!(
        output,
        r#"<mip-img src="a.png" width="200" height="100" layout="fixed"></mip-img>"#
    );
}

// =============================================================================
// Probe failures
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_request_error_reverts_to_img() {
    let fetcher = FakeFetcher::new().reply(BROKEN, Reply::Fail);
    let html = format!(r#"<img src="{BROKEN}">"#);

    let output = engine(&fetcher).transform(&html).await.unwrap();
    assert_eq!(output, html);
}

#[tokio::test(start_paused = true)]
async fn test_decode_error_reverts_to_img() {
    let fetcher = FakeFetcher::new().reply(BROKEN, Reply::bytes(vec![0x2c, 0xbe, 0xa4, 0x40]));
    let html = format!(r#"<img src="{BROKEN}">"#);

    let output = engine(&fetcher).transform(&html).await.unwrap();
    assert_eq!(output, html);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_reverts_to_img() {
    let fetcher = FakeFetcher::new().reply(
        BROKEN,
        Reply::image(50, 50).delayed(Duration::from_millis(5500)),
    );
    let html = format!(r#"<img src="{BROKEN}">"#);

    let output = engine(&fetcher).transform(&html).await.unwrap();
    assert_eq!(output, html);
}

#[tokio::test(start_paused = true)]
async fn test_reverted_img_keeps_original_attributes() {
    let fetcher = FakeFetcher::new().reply(BROKEN, Reply::Stall);
    let html = format!(r#"<p><img src="{BROKEN}" alt="broken" height="5"> caption</p>"#);

    let output = engine(&fetcher).transform(&html).await.unwrap();
    assert_eq!(output, html);
}

// =============================================================================
// Iframes
// =============================================================================

#[tokio::test]
async fn test_iframe_fills_missing_dimensions() {
    let output = engine(&FakeFetcher::new())
        .transform(r#"<iframe src="https://www.youtube.com/embed/HMQkV5cTuoY" width="400"></iframe>"#)
        .await
        .unwrap();

    assert_eq!(
        output,
        r#"<mip-iframe src="https://www.youtube.com/embed/HMQkV5cTuoY" width="400" height="400" layout="responsive" sandbox="allow-script allow-same-origin"></mip-iframe>"#
    );
}

#[tokio::test]
async fn test_protocol_relative_iframe() {
    let output = engine(&FakeFetcher::new())
        .transform(r#"<iframe src="//giphy.com/embed/X" width="480" height="372"></iframe>"#)
        .await
        .unwrap();

    assert_eq!(
        output,
        r#"<mip-iframe src="https://giphy.com/embed/X" width="480" height="372" layout="responsive" sandbox="allow-script allow-same-origin"></mip-iframe>"#
    );
}

#[tokio::test]
async fn test_http_iframe_and_following_markup() {
    let html = concat!(
        r#"<iframe src="http://giphy.com/embed/3oEduKP4VaUxJvLwuA" width="480" height="372" class="giphy-embed" allowFullScreen></iframe>"#,
        r#"<p><a href="http://giphy.com/gifs/afv-funny-fail-lol-3oEduKP4VaUxJvLwuA">via GIPHY</a></p>"#,
    );

    let output = engine(&FakeFetcher::new()).transform(html).await.unwrap();

    assert!(output.starts_with("<mip-iframe"));
    assert!(output.contains(r#"src="https://giphy.com/embed/3oEduKP4VaUxJvLwuA""#));
    assert!(output.contains(r#"layout="responsive""#));
    assert!(output.contains(r#"width="480""#));
    assert!(output.contains(r#"height="372""#));
    assert!(output.contains(r#"sandbox="allow-script allow-same-origin""#));
    assert!(output.contains("</mip-iframe>"));
    // Only `src` is upgraded
    assert!(output.ends_with(
        r#"<p><a href="http://giphy.com/gifs/afv-funny-fail-lol-3oEduKP4VaUxJvLwuA">via GIPHY</a></p>"#
    ));
}

#[tokio::test]
async fn test_iframe_keeps_explicit_sandbox_and_layout() {
    let output = engine(&FakeFetcher::new())
        .transform(r#"<iframe src="https://x.com/e" width="100" sandbox="allow-scripts" layout="fill"></iframe>"#)
        .await
        .unwrap();

    assert!(output.contains(r#"sandbox="allow-scripts""#));
    assert!(output.contains(r#"layout="fill""#));
    assert!(!output.contains("allow-same-origin"));
}

#[tokio::test]
async fn test_narrow_iframe_is_fixed() {
    let output = engine(&FakeFetcher::new())
        .transform(r#"<iframe src="https://x.com/e" width="250" height="100"></iframe>"#)
        .await
        .unwrap();
    assert!(output.contains(r#"layout="fixed""#));
}

// =============================================================================
// Audio
// =============================================================================

#[tokio::test]
async fn test_audio_with_fallback_text() {
    let output = engine(&FakeFetcher::new())
        .transform(r#"<audio src="http://foo.mp3" autoplay>Your browser does not support the <code>audio</code> element.</audio>"#)
        .await
        .unwrap();

    assert!(output.contains(r#"<mip-audio src="https://foo.mp3" autoplay="">"#));
    assert!(output.contains("Your browser does not support the <code>audio</code> element."));
    assert!(output.ends_with("</mip-audio>"));
}

#[tokio::test]
async fn test_audio_with_source_keeps_attributes() {
    let output = engine(&FakeFetcher::new())
        .transform(r#"<audio controls="controls" width="auto" height="50" autoplay="mobile">Your browser does not support the <code>audio</code> element.<source src="//foo.wav" type="audio/wav"></audio>"#)
        .await
        .unwrap();

    assert!(output.contains(
        r#"<mip-audio controls="controls" width="auto" height="50" autoplay="mobile">"#
    ));
    assert!(output.contains(r#"<source src="https://foo.wav" type="audio/wav">"#));
    assert!(!output.contains("</source>"));
    assert!(output.ends_with("</mip-audio>"));
}

#[tokio::test]
async fn test_audio_with_tracks() {
    let output = engine(&FakeFetcher::new())
        .transform(r#"<audio src="foo.ogg"><track kind="captions" src="https://foo.en.vtt" srclang="en" label="English"><track kind="captions" src="http://foo.sv.vtt" srclang="sv" label="Svenska"></audio>"#)
        .await
        .unwrap();

    assert!(output.contains(r#"<mip-audio src="foo.ogg">"#));
    assert!(output.contains(
        r#"<track kind="captions" src="https://foo.en.vtt" srclang="en" label="English">"#
    ));
    assert!(output.contains(
        r#"<track kind="captions" src="https://foo.sv.vtt" srclang="sv" label="Svenska">"#
    ));
    assert!(output.ends_with("</mip-audio>"));
}

// =============================================================================
// Ordering, isolation and errors
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_siblings_are_probed_one_at_a_time() {
    let fetcher = FakeFetcher::new()
        .reply(
            "http://a.test/1.png",
            Reply::image(100, 100).delayed(Duration::from_millis(3000)),
        )
        .reply(
            "http://a.test/2.png",
            Reply::image(400, 300).delayed(Duration::from_millis(1000)),
        )
        .reply(
            "http://a.test/3.png",
            Reply::image(10, 10).delayed(Duration::from_millis(2000)),
        );

    let output = engine(&fetcher)
        .transform(concat!(
            r#"<p><img src="http://a.test/1.png"></p>"#,
            r#"<img src="http://a.test/2.png">"#,
            r#"<div><span><img src="http://a.test/3.png"></span></div>"#,
        ))
        .await
        .unwrap();

    assert_eq!(fetcher.max_in_flight(), 1);
    assert_eq!(
        fetcher.requests(),
        vec![
            "http://a.test/1.png",
            "http://a.test/2.png",
            "http://a.test/3.png"
        ]
    );
    assert_eq!(
        output,
        concat!(
            r#"<p><mip-img src="https://a.test/1.png" width="100" height="100" layout="fixed"></mip-img></p>"#,
            r#"<mip-img src="https://a.test/2.png" width="400" height="300" layout="responsive"></mip-img>"#,
            r#"<div><span><mip-img src="https://a.test/3.png" width="10" height="10" layout="fixed"></mip-img></span></div>"#,
        )
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_calls_are_isolated() {
    let fetcher = FakeFetcher::new()
        .reply(
            "http://slow.test/a.png",
            Reply::image(50, 50).delayed(Duration::from_millis(3000)),
        )
        .reply(
            "http://fast.test/b.png",
            Reply::image(640, 480).delayed(Duration::from_millis(500)),
        );
    let engine = engine(&fetcher);

    let (first, second) = tokio::join!(
        engine.transform(r#"<p>first</p><img src="http://slow.test/a.png">"#),
        engine.transform(r#"<p>second</p><img src="http://fast.test/b.png">"#),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(fetcher.max_in_flight(), 2);
    assert_eq!(
        first,
        r#"<p>first</p><mip-img src="https://slow.test/a.png" width="50" height="50" layout="fixed"></mip-img>"#
    );
    assert_eq!(
        second,
        r#"<p>second</p><mip-img src="https://fast.test/b.png" width="640" height="480" layout="responsive"></mip-img>"#
    );
}

#[tokio::test(start_paused = true)]
async fn test_callbacks_receive_their_own_result() {
    let fetcher = FakeFetcher::new()
        .reply(
            "http://slow.test/a.png",
            Reply::image(50, 50).delayed(Duration::from_millis(3000)),
        )
        .reply(
            "http://fast.test/b.png",
            Reply::image(640, 480).delayed(Duration::from_millis(500)),
        );
    let engine = engine(&fetcher);

    let (first_tx, first_rx) = oneshot::channel();
    let (second_tx, second_rx) = oneshot::channel();

    let first = engine
        .transform_with_callback(
            r#"<img src="http://slow.test/a.png">"#,
            Some(move |result| {
                first_tx.send(result).unwrap();
            }),
        )
        .unwrap();
    let second = engine
        .transform_with_callback(
            r#"<img src="http://fast.test/b.png">"#,
            Some(move |result| {
                second_tx.send(result).unwrap();
            }),
        )
        .unwrap();

    let second_output = second_rx.await.unwrap().unwrap();
    let first_output = first_rx.await.unwrap().unwrap();
    first.await.unwrap();
    second.await.unwrap();

    assert!(first_output.contains("slow.test"));
    assert!(!first_output.contains("fast.test"));
    assert!(second_output.contains("fast.test"));
    assert!(!second_output.contains("slow.test"));
}

#[tokio::test]
async fn test_callback_is_required() {
    let engine = engine(&FakeFetcher::new());
    let result = engine.transform_with_callback("<p>x</p>", None::<fn(Result<String, TransformError>)>);
    assert!(matches!(result, Err(TransformError::MissingCallback)));
}

#[test]
fn test_callback_outside_runtime() {
    let engine = engine(&FakeFetcher::new());
    let result = engine.transform_with_callback("<p>x</p>", Some(|_| {}));
    assert!(matches!(result, Err(TransformError::NoRuntime)));
}

#[tokio::test]
async fn test_missing_tag_defaults_aborts_call() {
    let fetcher = FakeFetcher::new().reply("http://a.test/1.png", Reply::image(10, 10));
    let mut config = MipConfig::default();
    config.tags.remove(MIP_IFRAME);
    let engine = Miperize::with_parts(config, fetcher.clone(), ImageDecoder);

    let result = engine
        .transform(r#"<p>a</p><iframe src="https://x.com/e"></iframe><img src="http://a.test/1.png">"#)
        .await;

    assert!(matches!(result, Err(TransformError::MissingTagDefaults(tag)) if tag == MIP_IFRAME));
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_call_ids_are_unique() {
    let engine = engine(&FakeFetcher::new());
    let first = engine.next_call();
    let second = engine.clone().next_call();
    assert_ne!(first, second);
    assert_eq!(second.get(), first.get() + 1);
    assert_eq!(first.to_string(), format!("#{}", first.get()));
}
