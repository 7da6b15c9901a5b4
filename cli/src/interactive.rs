use std::io::{stdin, stdout, Write};

use anyhow::Result;
use core_mmu::{
    script::{self, Op},
    Translator,
};

#[cfg(feature = "stat")]
use core_mmu::stat::AddStats;

peg::parser!(grammar command() for str {
    rule unsigned() -> u32
        = n:$(quiet!{['0'..='9']+}) {? n.parse().or(Err("32-bit number")) }
        / expected!("unsigned")
    rule radix() -> u32
        = quiet!{"0" ['x' | 'X']} n:$(quiet!{['0'..='9'|'a'..='f'|'A'..='F']+}) {? u32::from_str_radix(n, 16).or(Err("32-bit number")) }
        / quiet!{"0" ['d' | 'D']} n:$(quiet!{['0'..='9']+}) {? n.parse().or(Err("32-bit number")) }
        / quiet!{"0"} n:$(quiet!{['0'..='7']+}) {? u32::from_str_radix(n, 8).or(Err("32-bit number")) }
    rule number() -> u32
        = radix() / unsigned()

    rule translate() = "translate" / "t"
    rule map() = "map" / "set"
    rule presence() -> bool
        = "absent" { false }
        / "present" { true }
    rule op() -> Op
        = map() __ vpn:number() __ ppn:number() present:(__ p:presence() { p })? {
            Op::Map { vpn, ppn, present: present.unwrap_or(true) }
        }
        / translate() __ address:number() { Op::Translate { address } }
        / "invalidate" __ vpn:number() { Op::Invalidate { vpn } }
        / "flush" { Op::Flush }
    rule show_kind() -> ShowKind
        = "tlb" { ShowKind::Tlb }
        / ("config" / "cfg") { ShowKind::Config }
        / "table" { ShowKind::Table }
        / "stat" { ShowKind::Stat }
    pub(crate) rule parse_command() -> Command
        = _ o:op() _ { Command::Op(o) }
        / _ "hits" _ { Command::Hits }
        / _ "show" __ k:show_kind() _ { Command::Show(k) }
        / _ "exit" _ { Command::Exit }
        / _ { Command::Empty }
        / expected!("command")

    rule ws() = quiet!{[' ' | '\t' | '\r' | '\n']}
        / expected!("whitespace")
    rule _() = ws()*
    rule __() = ws()+
});

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Op(Op),
    Hits,
    Show(ShowKind),
    Empty,
    Exit,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ShowKind {
    Tlb,
    Config,
    Table,
    Stat,
}

fn show(translator: &Translator, kind: ShowKind) {
    match kind {
        ShowKind::Tlb => print!("{}", translator.tlb()),
        ShowKind::Config => println!("{}", translator.config()),
        ShowKind::Table => {
            let pt = translator.page_table();
            println!("{} of {} pages present.", pt.mapped_count(), pt.size());
        }
        #[cfg(feature = "stat")]
        ShowKind::Stat => {
            let mut stats = Default::default();
            translator.add_stats(&mut stats);
            println!("{}", stats.view(crate::stat_width()));
        }
        #[cfg(not(feature = "stat"))]
        ShowKind::Stat => {
            println!("try compile with `--features stat`");
        }
    }
}

pub fn execute_interactive(translator: &mut Translator) -> Result<()> {
    println!("entering interactive.");
    loop {
        print!("> ");
        stdout().flush()?;
        let mut str = String::new();
        if stdin().read_line(&mut str)? == 0 {
            break;
        }
        let parsed = match command::parse_command(&str) {
            Ok(p) => p,
            Err(e) => {
                println!("parse error: expected {}", e.expected);
                continue;
            }
        };
        match parsed {
            Command::Op(op) => println!("{}", script::apply(translator, op)),
            Command::Hits => println!("hits: {}", translator.number_of_hits()),
            Command::Show(kind) => show(translator, kind),
            Command::Empty => (),
            Command::Exit => break,
        }
    }
    println!("exiting interactive.");
    Ok(())
}
