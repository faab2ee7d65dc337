//! Plain-text list and rank files for the command line tool.
//!
//! List file: a header line `n head`, then n successors separated by any
//! whitespace; `none` or `-1` marks the tail.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, bail, ensure};

use crate::list::{Index, LinkedList, MAX_LEN, NONE};

pub fn read_list<P: AsRef<Path>>(p: P) -> Result<LinkedList> {
    let p = p.as_ref();
    let f = File::open(p).with_context(|| format!("open list file {}", p.display()))?;
    parse_list(BufReader::new(f)).with_context(|| format!("parse list file {}", p.display()))
}

pub fn parse_list<R: Read>(r: R) -> Result<LinkedList> {
    let mut lines = BufReader::new(r).lines();
    let hdr = loop {
        let l = lines.next().context("empty list file")??;
        if !l.trim().is_empty() {
            break l;
        }
    };
    let mut it = hdr.split_whitespace();
    let n: usize = it
        .next()
        .context("missing length")?
        .parse()
        .context("bad length")?;
    let head: Index = it
        .next()
        .context("missing head")?
        .parse()
        .context("bad head")?;
    ensure!(n > 0 && n <= MAX_LEN, "length {n} outside 1..={MAX_LEN}");
    ensure!((head as usize) < n, "head {head} out of range (n = {n})");

    // header is untrusted: grow past 1M entries instead of trusting n
    let mut next: Vec<Index> = crate::rank::try_reserved(n.min(1 << 20), "successors")?;
    for l in lines {
        let row = l?;
        for tok in row.split_whitespace() {
            let v = match tok {
                "none" | "-1" => NONE,
                t => t
                    .parse::<Index>()
                    .with_context(|| format!("bad successor '{t}' at position {}", next.len()))?,
            };
            if next.len() == n {
                bail!("more than {n} successors");
            }
            next.push(v);
        }
    }
    ensure!(next.len() == n, "expected {n} successors, found {}", next.len());
    Ok(LinkedList::new(next, head))
}

pub fn write_list<P: AsRef<Path>>(list: &LinkedList, p: P) -> Result<()> {
    let mut out = BufWriter::with_capacity(16 << 20, File::create(p.as_ref())?); // 16 MiB buffer
    writeln!(out, "{} {}", list.len(), list.head)?;
    for &s in &list.next {
        if s == NONE {
            writeln!(out, "none")?;
        } else {
            writeln!(out, "{s}")?;
        }
    }
    out.flush()?;
    Ok(())
}

/// One rank per line, in element order.
pub fn write_ranks<P: AsRef<Path>>(rank: &[Index], p: P) -> Result<()> {
    let mut out = BufWriter::with_capacity(16 << 20, File::create(p.as_ref())?);
    for r in rank {
        writeln!(out, "{r}")?;
    }
    out.flush()?;
    Ok(())
}
