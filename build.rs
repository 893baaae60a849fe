use vergen::EmitBuilder;

fn main() {
    // 把构建与 git 信息注入编译期环境变量
    if let Err(e) = EmitBuilder::builder().all_build().all_git().emit() {
        println!("cargo:warning=生成构建信息失败: {}", e);
    }
}
