//! 实验结果.

use crate::methods::Profile;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.6}"),
            None => "/".to_string(),
        }
    }

    #[inline]
    fn u64_to_display(u: Option<u64>) -> String {
        match u {
            Some(u) => u.to_string(),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Completed rounds: {}", p.get_rounds())?;
    writeln!(w, "{S4}Failed rounds: {}", p.get_failed())?;
    writeln!(
        w,
        "{S4}Correct images: {} / {}",
        p.get_correct(),
        p.get_known()
    )?;
    writeln!(
        w,
        "{S4}Mean accuracy: {} ± {}",
        f64_to_display(p.get_mean_accuracy()),
        f64_to_display(p.get_std_accuracy())
    )?;
    writeln!(
        w,
        "{S4}Accuracy range: [{}, {}]",
        f64_to_display(p.get_worst()),
        f64_to_display(p.get_best())
    )?;
    writeln!(w, "{S4}Evaluation total time: {} us", p.get_eval_time_us())?;
    writeln!(
        w,
        "{S4}Evaluation average time: {} us",
        f64_to_display(p.get_avg_eval_time_us())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    let t = p.get_slowest_round().map(|d| d.as_micros() as u64);
    write!(w, "{S4}Slowest round costs {} us", u64_to_display(t))?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);

        for (key, profile) in self.data.iter() {
            describe_into(key, profile, &mut buf).expect("Writing into memory buffer");
            println!("{}", String::from_utf8_lossy(&buf));
            buf.clear();

            utils::sep();
        }

        let best = self
            .data
            .iter()
            .filter_map(|(k, p)| Some((*k, p.get_mean_accuracy()?)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((key, acc)) = best {
            println!("Best method: `{key}` ({acc:.6})");
            utils::sep_to(io::stdout()).expect("Writing to stdout");
        }
    }
}
