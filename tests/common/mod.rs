#![allow(dead_code)]

use seqlab_jobs::alignment::ToolSet;
use seqlab_jobs::utils::external_tools::ToolCommand;
use std::fs;
use std::path::{Path, PathBuf};

/// Shell-script stand-ins for bwa, samtools and freebayes.
pub struct FakeTools {
    pub bwa: PathBuf,
    pub samtools: PathBuf,
    pub freebayes: PathBuf,
    /// Arguments of the last `bwa mem` call
    pub bwa_log: PathBuf,
}

pub struct FakeBehavior {
    /// Text placed in the flagstat "mapped" line, e.g. "90.00"
    pub mapped_percent: &'static str,
    /// Leave the "mapped" line out of flagstat entirely
    pub omit_mapped_line: bool,
    pub fail_sort: bool,
    pub slow_index_secs: Option<u32>,
}

impl Default for FakeBehavior {
    fn default() -> Self {
        Self {
            mapped_percent: "90.00",
            omit_mapped_line: false,
            fail_sort: false,
            slow_index_secs: None,
        }
    }
}

impl FakeTools {
    pub fn install(dir: &Path, behavior: FakeBehavior) -> Self {
        let bwa_log = dir.join("bwa_mem.args");
        let index = match behavior.slow_index_secs {
            Some(secs) => format!("exec sleep {}", secs),
            None => "exit 0".to_string(),
        };
        let bwa = write_script(
            dir,
            "fake_bwa.sh",
            &format!(
                r#"case "$1" in
  index) {index} ;;
  mem)
    shift
    echo "$@" > "{log}"
    printf '@HD\tVN:1.6\nr1\t0\tchr1\t1\t60\t4M\t*\t0\t0\tACGT\tIIII\n'
    ;;
  *) echo "usage: bwa <command>" >&2; exit 1 ;;
esac
"#,
                index = index,
                log = bwa_log.display()
            ),
        );

        let sort = if behavior.fail_sort {
            r#"echo "[bam_sort_core] truncated file. Aborting." >&2; exit 1"#.to_string()
        } else {
            r#"shift
    out=""
    input=""
    while [ $# -gt 0 ]; do
      case "$1" in
        -o) out="$2"; shift 2 ;;
        *) input="$1"; shift ;;
      esac
    done
    cp "$input" "$out""#
                .to_string()
        };
        let mapped_line = if behavior.omit_mapped_line {
            String::new()
        } else {
            format!("printf '9 + 0 mapped ({}%% : N/A)\\n'", behavior.mapped_percent)
        };
        let samtools = write_script(
            dir,
            "fake_samtools.sh",
            &format!(
                r#"case "$1" in
  view) cat ;;
  sort)
    {sort}
    ;;
  index) touch "$2.bai" ;;
  flagstat)
    printf '10 + 0 in total (QC-passed reads + QC-failed reads)\n'
    printf '0 + 0 secondary\n'
    {mapped_line}
    ;;
  *) echo "usage: samtools <command>" >&2; exit 1 ;;
esac
"#,
                sort = sort,
                mapped_line = mapped_line
            ),
        );

        let freebayes = write_script(
            dir,
            "fake_freebayes.sh",
            r#"if [ $# -eq 0 ]; then echo "usage: freebayes -f ref.fa aln.bam" >&2; exit 1; fi
printf '##fileformat=VCFv4.2\n'
printf '#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n'
printf 'chr1\t1\t.\tA\tG\t50\t.\t.\n'
printf 'chr1\t5\t.\tC\tT\t50\t.\t.\n'
"#,
        );

        Self {
            bwa,
            samtools,
            freebayes,
            bwa_log,
        }
    }

    pub fn toolset(&self) -> ToolSet {
        ToolSet {
            bwa: ToolCommand::new("sh").arg(&self.bwa),
            samtools: ToolCommand::new("sh").arg(&self.samtools),
            freebayes: ToolCommand::new("sh").arg(&self.freebayes),
        }
    }

    /// Config-file form of the tool commands.
    pub fn command_lines(&self) -> (String, String, String) {
        (
            format!("sh {}", self.bwa.display()),
            format!("sh {}", self.samtools.display()),
            format!("sh {}", self.freebayes.display()),
        )
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn reference(dir: &Path) -> PathBuf {
    write_file(dir, "genome.fa", ">chr1\nACGTACGTACGTACGTACGT\n")
}

pub fn reads(dir: &Path, name: &str) -> PathBuf {
    write_file(dir, name, "@r1\nACGT\n+\nIIII\n@r2\nACGA\n+\nIIII\n")
}
