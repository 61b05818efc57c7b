//! FFmpeg argument construction for each transform kind.

use std::ffi::OsString;
use std::path::Path;

use super::{ConcatMode, TransformKind, TransformRequest};

/// Native single-stage range of the atempo filter.
const ATEMPO_MIN: f64 = 0.5;
const ATEMPO_MAX: f64 = 2.0;

/// Build the FFmpeg argument list for a request.
///
/// `concat_list` is the pre-written demuxer list file, required only for
/// stream-copy concatenation. The output path is always last.
pub fn build_args(request: &TransformRequest, concat_list: Option<&Path>) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    match &request.kind {
        TransformKind::Trim { start, end } => {
            push(&mut args, ["-i"]);
            args.push(request.inputs[0].clone().into());
            push(
                &mut args,
                [
                    "-ss",
                    &format!("{start:.3}"),
                    "-t",
                    &format!("{:.3}", end - start),
                    "-c",
                    "copy",
                    "-avoid_negative_ts",
                    "1",
                ],
            );
        }
        TransformKind::ChangeSpeed { speed } => {
            push(&mut args, ["-i"]);
            args.push(request.inputs[0].clone().into());
            let filter = format!(
                "[0:v]setpts={}*PTS[v];[0:a]{}[a]",
                1.0 / speed,
                atempo_chain(*speed)
            );
            push(
                &mut args,
                [
                    "-filter_complex",
                    &filter,
                    "-map",
                    "[v]",
                    "-map",
                    "[a]",
                    "-c:v",
                    "libx264",
                    "-preset",
                    "fast",
                    "-c:a",
                    "aac",
                ],
            );
        }
        TransformKind::MusicOverlay {
            music_uri,
            music_volume,
            original_volume,
        } => {
            push(&mut args, ["-i"]);
            args.push(request.inputs[0].clone().into());
            push(&mut args, ["-i"]);
            args.push(music_uri.clone().into());
            let filter = format!(
                "[0:a]volume={original_volume}[a0];[1:a]volume={music_volume}[a1];\
                 [a0][a1]amix=inputs=2:duration=first[aout]"
            );
            push(
                &mut args,
                [
                    "-filter_complex",
                    &filter,
                    "-map",
                    "0:v",
                    "-map",
                    "[aout]",
                    "-c:v",
                    "copy",
                    "-c:a",
                    "aac",
                    "-shortest",
                ],
            );
        }
        // Stream copy needs the demuxer list file; without one, fall
        // back to the filter-graph concat, which only costs a re-encode.
        TransformKind::Concat {
            mode: ConcatMode::StreamCopy,
        } if concat_list.is_some() => {
            push(&mut args, ["-f", "concat", "-safe", "0", "-i"]);
            if let Some(list) = concat_list {
                args.push(list.as_os_str().to_os_string());
            }
            push(&mut args, ["-c", "copy"]);
        }
        TransformKind::Concat { .. } => {
            for input in &request.inputs {
                push(&mut args, ["-i"]);
                args.push(input.clone().into());
            }
            let mut filter = String::new();
            for i in 0..request.inputs.len() {
                filter.push_str(&format!("[{i}:v][{i}:a]"));
            }
            filter.push_str(&format!(
                "concat=n={}:v=1:a=1[outv][outa]",
                request.inputs.len()
            ));
            push(
                &mut args,
                [
                    "-filter_complex",
                    &filter,
                    "-map",
                    "[outv]",
                    "-map",
                    "[outa]",
                    "-c:v",
                    "libx264",
                    "-preset",
                    "fast",
                    "-c:a",
                    "aac",
                ],
            );
        }
    }

    args.push(request.output.clone().into());
    args
}

/// atempo filter chain for a playback speed.
///
/// atempo only accepts [0.5, 2.0] per stage; outside that range two
/// stages are composed so audio duration still matches the `1/speed`
/// video timestamp scale.
fn atempo_chain(speed: f64) -> String {
    if (ATEMPO_MIN..=ATEMPO_MAX).contains(&speed) {
        format!("atempo={speed}")
    } else if speed > ATEMPO_MAX {
        format!("atempo=2.0,atempo={}", speed / ATEMPO_MAX)
    } else {
        format!("atempo=0.5,atempo={}", speed / ATEMPO_MIN)
    }
}

fn push<const N: usize>(args: &mut Vec<OsString>, items: [&str; N]) {
    args.extend(items.iter().map(OsString::from));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn arg_strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn atempo_stays_single_stage_in_native_range() {
        assert_eq!(atempo_chain(1.5), "atempo=1.5");
        assert_eq!(atempo_chain(0.5), "atempo=0.5");
        assert_eq!(atempo_chain(2.0), "atempo=2");
    }

    #[test]
    fn atempo_chains_above_native_range() {
        assert_eq!(atempo_chain(3.0), "atempo=2.0,atempo=1.5");
        assert_eq!(atempo_chain(4.0), "atempo=2.0,atempo=2");
    }

    #[test]
    fn atempo_chains_below_native_range() {
        assert_eq!(atempo_chain(0.25), "atempo=0.5,atempo=0.5");
    }

    #[test]
    fn trim_uses_stream_copy() {
        let req = TransformRequest::single(
            TransformKind::Trim {
                start: 2.0,
                end: 7.5,
            },
            "/in.mp4",
            "/out.mp4",
        );
        let args = arg_strings(&build_args(&req, None));
        assert!(args.windows(2).any(|w| w == ["-ss", "2.000"]));
        assert!(args.windows(2).any(|w| w == ["-t", "5.500"]));
        assert!(args.windows(2).any(|w| w == ["-c", "copy"]));
        assert_eq!(args.last().unwrap(), "/out.mp4");
    }

    #[test]
    fn speed_filter_scales_video_timestamps() {
        let req = TransformRequest::single(
            TransformKind::ChangeSpeed { speed: 2.0 },
            "/in.mp4",
            "/out.mp4",
        );
        let args = arg_strings(&build_args(&req, None));
        let filter = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(filter.contains("setpts=0.5*PTS"));
        assert!(filter.contains("atempo=2"));
    }

    #[test]
    fn stream_copy_concat_reads_list_file() {
        let req = TransformRequest {
            kind: TransformKind::Concat {
                mode: ConcatMode::StreamCopy,
            },
            inputs: vec![PathBuf::from("/a.mp4"), PathBuf::from("/b.mp4")],
            output: PathBuf::from("/reel.mp4"),
        };
        let args = arg_strings(&build_args(&req, Some(Path::new("/scratch/list.txt"))));
        assert!(args.windows(2).any(|w| w == ["-f", "concat"]));
        assert!(args.contains(&"/scratch/list.txt".to_string()));
        assert!(args.windows(2).any(|w| w == ["-c", "copy"]));
    }

    #[test]
    fn reencode_concat_builds_n_ary_filter() {
        let req = TransformRequest {
            kind: TransformKind::Concat {
                mode: ConcatMode::Reencode,
            },
            inputs: vec![
                PathBuf::from("/a.mp4"),
                PathBuf::from("/b.mp4"),
                PathBuf::from("/c.mp4"),
            ],
            output: PathBuf::from("/reel.mp4"),
        };
        let args = arg_strings(&build_args(&req, None));
        let filter = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(filter.starts_with("[0:v][0:a][1:v][1:a][2:v][2:a]"));
        assert!(filter.contains("concat=n=3:v=1:a=1"));
    }
}
