//! Downloader command line construction.

use std::path::Path;

use super::config::{CookieSource, DownloaderConfig};
use super::types::LaunchRequest;

/// Build the downloader argument list for one attempt.
///
/// `merge_tool` is passed explicitly when it was located, so the downloader
/// does not depend on its own lookup.
pub fn build_args(
    config: &DownloaderConfig,
    request: &LaunchRequest,
    merge_tool: Option<&Path>,
) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(merge_tool) = merge_tool {
        args.extend([
            "--ffmpeg-location".to_string(),
            merge_tool.display().to_string(),
        ]);
    }

    args.extend([
        "-f".to_string(),
        config.format.clone(),
        "--merge-output-format".to_string(),
        config.merge_output_format.clone(),
    ]);

    if config.subtitles {
        args.extend([
            "--write-subs".to_string(),
            "--write-auto-subs".to_string(),
            "--convert-subs".to_string(),
            config.subtitle_format.clone(),
        ]);
    }

    args.extend([
        "--ignore-errors".to_string(),
        "--newline".to_string(),
        "--no-playlist".to_string(),
    ]);

    match config.cookie_source() {
        Some(CookieSource::Browser(browser)) => {
            args.extend(["--cookies-from-browser".to_string(), browser]);
        }
        Some(CookieSource::File(path)) => {
            args.extend(["--cookies".to_string(), path.display().to_string()]);
        }
        None => {}
    }

    if let Some(proxy) = config.proxy_url.as_ref().filter(|p| !p.is_empty()) {
        args.extend(["--proxy".to_string(), proxy.clone()]);
    }

    if let Some(user_agent) = config.user_agent.as_ref().filter(|u| !u.is_empty()) {
        args.extend(["--user-agent".to_string(), user_agent.clone()]);
    }

    args.extend(config.extra_args.iter().cloned());

    // The output argument is a template; literal percent signs must be doubled.
    args.extend([
        "-o".to_string(),
        request.output_path.display().to_string().replace('%', "%%"),
        request.source_url.clone(),
    ]);

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request() -> LaunchRequest {
        LaunchRequest {
            job_id: "abc".to_string(),
            attempt: 1,
            source_url: "https://www.youtube.com/watch?v=abc".to_string(),
            output_path: PathBuf::from("/lib/G/C/Title.mp4"),
        }
    }

    fn position(args: &[String], flag: &str) -> Option<usize> {
        args.iter().position(|a| a == flag)
    }

    #[test]
    fn test_default_args() {
        let args = build_args(&DownloaderConfig::default(), &request(), None);

        assert!(position(&args, "--ffmpeg-location").is_none());
        assert!(position(&args, "--cookies").is_none());
        assert!(position(&args, "--cookies-from-browser").is_none());

        let f = position(&args, "-f").unwrap();
        assert!(args[f + 1].contains("vcodec^=avc1"));
        assert!(args[f + 1].ends_with("/best"));

        let merge = position(&args, "--merge-output-format").unwrap();
        assert_eq!(args[merge + 1], "mp4");

        assert!(position(&args, "--write-subs").is_some());
        assert!(position(&args, "--write-auto-subs").is_some());
        assert!(position(&args, "--ignore-errors").is_some());
        assert!(position(&args, "--newline").is_some());

        let ua = position(&args, "--user-agent").unwrap();
        assert!(args[ua + 1].contains("Chrome/"));

        let n = args.len();
        assert_eq!(args[n - 3], "-o");
        assert_eq!(args[n - 2], "/lib/G/C/Title.mp4");
        assert_eq!(args[n - 1], "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn test_empty_user_agent_is_omitted() {
        let config = DownloaderConfig {
            user_agent: Some(String::new()),
            ..Default::default()
        };
        let args = build_args(&config, &request(), None);
        assert!(position(&args, "--user-agent").is_none());
    }

    #[test]
    fn test_merge_tool_location() {
        let args = build_args(
            &DownloaderConfig::default(),
            &request(),
            Some(Path::new("/opt/bin/ffmpeg")),
        );
        let i = position(&args, "--ffmpeg-location").unwrap();
        assert_eq!(args[i + 1], "/opt/bin/ffmpeg");
    }

    #[test]
    fn test_browser_cookies() {
        let config = DownloaderConfig {
            cookie_source: Some("chrome".to_string()),
            ..Default::default()
        };
        let args = build_args(&config, &request(), None);
        let i = position(&args, "--cookies-from-browser").unwrap();
        assert_eq!(args[i + 1], "chrome");
        assert!(position(&args, "--cookies").is_none());
    }

    #[test]
    fn test_cookie_file() {
        let config = DownloaderConfig {
            cookie_source: Some("/tmp/cookies.txt".to_string()),
            ..Default::default()
        };
        let args = build_args(&config, &request(), None);
        let i = position(&args, "--cookies").unwrap();
        assert_eq!(args[i + 1], "/tmp/cookies.txt");
        assert!(position(&args, "--cookies-from-browser").is_none());
    }

    #[test]
    fn test_subtitles_disabled() {
        let config = DownloaderConfig {
            subtitles: false,
            ..Default::default()
        };
        let args = build_args(&config, &request(), None);
        assert!(position(&args, "--write-subs").is_none());
        assert!(position(&args, "--convert-subs").is_none());
    }

    #[test]
    fn test_proxy_user_agent_and_extra_args() {
        let config = DownloaderConfig {
            proxy_url: Some("socks5://127.0.0.1:1080".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
            extra_args: vec!["--limit-rate".to_string(), "2M".to_string()],
            ..Default::default()
        };
        let args = build_args(&config, &request(), None);
        let proxy = position(&args, "--proxy").unwrap();
        assert_eq!(args[proxy + 1], "socks5://127.0.0.1:1080");
        let ua = position(&args, "--user-agent").unwrap();
        assert_eq!(args[ua + 1], "Mozilla/5.0");
        assert!(position(&args, "--limit-rate").unwrap() < position(&args, "-o").unwrap());
    }

    #[test]
    fn test_percent_in_output_path_is_escaped() {
        let mut req = request();
        req.output_path = PathBuf::from("/lib/G/C/100% Pure.mp4");
        let args = build_args(&DownloaderConfig::default(), &req, None);
        let o = position(&args, "-o").unwrap();
        assert_eq!(args[o + 1], "/lib/G/C/100%% Pure.mp4");
    }
}
